//! Webhook-authenticated maintenance triggers.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use jiff::Timestamp;

use super::response::SweepReport;
use crate::TRACING_TARGET_HANDLER;
use crate::extract::WebhookAuth;
use crate::handler::Result;
use crate::pipeline::DemoPipeline;
use crate::service::ServiceState;

/// Runs a sweep of abandoned matches now.
async fn sweep(
    State(pipeline): State<Arc<DemoPipeline>>,
    _webhook: WebhookAuth,
) -> Result<Json<SweepReport>> {
    let report = pipeline.sweep(Timestamp::now()).await?;

    tracing::info!(
        target: TRACING_TARGET_HANDLER,
        expired = report.expired.len(),
        skipped = report.skipped,
        "Sweep triggered by webhook"
    );
    Ok(Json(report))
}

/// Returns a [`Router`] with all webhook routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/api/webhooks/sweep", post(sweep))
}
