//! Match and demo handlers for authenticated communities.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use axum_extra::TypedHeader;
use axum_extra::headers::ContentLength;
use futures::{StreamExt, TryStreamExt};

use super::request::{CreateMatch, EndMatch, Pagination};
use super::response::MatchView;
use crate::TRACING_TARGET_HANDLER;
use crate::extract::CommunityAuth;
use crate::handler::{ErrorKind, Result};
use crate::pipeline::DemoPipeline;
use crate::service::{MatchService, ServiceState};

#[tracing::instrument(skip_all, fields(community_id = %community.community_id))]
async fn list_matches(
    State(match_service): State<MatchService>,
    CommunityAuth(community): CommunityAuth,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<MatchView>>> {
    let views = match_service.list(&community, pagination.into()).await?;
    Ok(Json(views))
}

#[tracing::instrument(skip_all, fields(community_id = %community.community_id))]
async fn create_match(
    State(match_service): State<MatchService>,
    CommunityAuth(community): CommunityAuth,
    Json(request): Json<CreateMatch>,
) -> Result<(StatusCode, Json<MatchView>)> {
    let new_match = request.into_new_match()?;
    let view = match_service.create(&community, new_match).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[tracing::instrument(skip_all, fields(community_id = %community.community_id, match_id = %match_id))]
async fn get_match(
    State(match_service): State<MatchService>,
    CommunityAuth(community): CommunityAuth,
    Path(match_id): Path<String>,
) -> Result<Json<MatchView>> {
    Ok(Json(match_service.get(&community, &match_id).await?))
}

#[tracing::instrument(skip_all, fields(community_id = %community.community_id, match_id = %match_id))]
async fn end_match(
    State(match_service): State<MatchService>,
    CommunityAuth(community): CommunityAuth,
    Path(match_id): Path<String>,
    Json(request): Json<EndMatch>,
) -> Result<Json<MatchView>> {
    let view = match_service
        .end(&community, &match_id, request.into())
        .await?;
    Ok(Json(view))
}

/// Streams the request body into storage. `Content-Length` is required so
/// the size allowance is checked before any byte is transferred.
#[tracing::instrument(skip_all, fields(community_id = %community.community_id, match_id = %match_id))]
async fn upload_demo(
    State(pipeline): State<Arc<DemoPipeline>>,
    State(match_service): State<MatchService>,
    CommunityAuth(community): CommunityAuth,
    Path(match_id): Path<String>,
    content_length: Option<TypedHeader<ContentLength>>,
    body: Body,
) -> Result<Json<MatchView>> {
    let Some(TypedHeader(ContentLength(size))) = content_length else {
        return Err(ErrorKind::LengthRequired.with_resource("demo"));
    };

    tracing::debug!(target: TRACING_TARGET_HANDLER, size, "Demo upload started");

    let stream = body.into_data_stream().map_err(io::Error::other).boxed();
    let record = pipeline.upload(&community, &match_id, size, stream).await?;
    Ok(Json(match_service.view(&record)))
}

#[tracing::instrument(skip_all, fields(community_id = %community.community_id, match_id = %match_id))]
async fn resubmit_demo(
    State(pipeline): State<Arc<DemoPipeline>>,
    State(match_service): State<MatchService>,
    CommunityAuth(community): CommunityAuth,
    Path(match_id): Path<String>,
) -> Result<Json<MatchView>> {
    let record = pipeline.resubmit(&community, &match_id).await?;
    Ok(Json(match_service.view(&record)))
}

/// Returns a [`Router`] with the match routes, except demo uploads.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/api/matches", get(list_matches).post(create_match))
        .route("/api/matches/{match_id}", get(get_match))
        .route("/api/matches/{match_id}/end", post(end_match))
        .route("/api/matches/{match_id}/demo/resubmit", post(resubmit_demo))
}

/// Returns a [`Router`] with the demo upload route. It has no body limit.
pub fn upload_routes() -> Router<ServiceState> {
    Router::new().route(
        "/api/matches/{match_id}/demo",
        put(upload_demo).layer(DefaultBodyLimit::disable()),
    )
}
