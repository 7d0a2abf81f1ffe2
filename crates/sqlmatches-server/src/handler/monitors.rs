//! Health check handler.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use jiff::Timestamp;

use super::response::HealthStatus;
use crate::service::ServiceState;

async fn health_status(State(state): State<ServiceState>) -> Json<HealthStatus> {
    let storage = state
        .storage
        .as_ref()
        .map_or("none", |storage| storage.kind().as_str());

    Json(HealthStatus {
        status: "ok",
        cache: state.cache.backend_name(),
        storage,
        pending_matches: state.queue.len(),
        uptime_secs: Timestamp::now().duration_since(state.started_at).as_secs(),
    })
}

/// Returns a [`Router`] with the health route.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}
