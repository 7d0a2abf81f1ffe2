//! Root-only community administration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use super::request::CreateCommunity;
use super::response::CreatedCommunity;
use crate::extract::RootAuth;
use crate::handler::{ErrorKind, Result};
use crate::service::{CommunityService, Registration, ServiceState};

#[tracing::instrument(skip_all, fields(community_id = %request.community_id))]
async fn create_community(
    State(community_service): State<CommunityService>,
    _root: RootAuth,
    Json(request): Json<CreateCommunity>,
) -> Result<(StatusCode, Json<CreatedCommunity>)> {
    match community_service
        .register(&request.community_id, request.premium)
        .await?
    {
        Registration::Created { community, api_key } => Ok((
            StatusCode::CREATED,
            Json(CreatedCommunity {
                community_id: community.community_id,
                api_key,
                premium: community.premium,
            }),
        )),
        Registration::InvalidName => Err(ErrorKind::CommunityNameInvalid
            .with_resource("community")
            .with_context(request.community_id)),
        Registration::NameTaken => Err(ErrorKind::CommunityNameTaken
            .with_resource("community")
            .with_context(request.community_id)),
    }
}

/// Returns a [`Router`] with all community routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/api/communities", post(create_community))
}
