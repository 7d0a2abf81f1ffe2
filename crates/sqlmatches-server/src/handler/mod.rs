//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod communities;
mod error;
mod matches;
mod monitors;
pub mod request;
pub mod response;
mod webhooks;

use axum::Router;
use axum::response::{IntoResponse, Response};
use sqlmatches_storage::LOCAL_MOUNT_PATH;
use tower_http::services::ServeDir;

pub use crate::handler::error::{Error, ErrorKind, Result};
use crate::middleware::RouterAuthExt;
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with every route, each behind its auth gate.
pub fn routes(state: ServiceState) -> Router<ServiceState> {
    api_routes(state.clone()).merge(upload_routes(state))
}

/// Returns a [`Router`] with the demo upload route only.
///
/// Kept apart from [`api_routes`] so a transfer can be given a longer
/// deadline than ordinary requests.
pub fn upload_routes(state: ServiceState) -> Router<ServiceState> {
    matches::upload_routes().with_community_authentication(state)
}

/// Returns a [`Router`] with every route except demo uploads.
///
/// When the active storage backend keeps demos on local disk, its directory
/// is served under `/demos`.
pub fn api_routes(state: ServiceState) -> Router<ServiceState> {
    let community_routes = matches::routes().with_community_authentication(state.clone());
    let root_routes = communities::routes().with_root_authentication(state.clone());
    let webhook_routes = webhooks::routes().with_webhook_authentication(state.clone());

    let mut router = Router::new()
        .merge(community_routes)
        .merge(root_routes)
        .merge(webhook_routes)
        .merge(monitors::routes());

    if let Some(directory) = state.storage.as_ref().and_then(|s| s.local_root()) {
        router = router.nest_service(LOCAL_MOUNT_PATH, ServeDir::new(directory));
    }

    router.fallback(fallback)
}
