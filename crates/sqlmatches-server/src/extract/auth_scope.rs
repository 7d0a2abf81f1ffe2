use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::handler::{Error, ErrorKind};
use crate::model::Community;

/// Who a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScope {
    /// The root operator.
    Root,
    /// A community, by its API key.
    Community(Community),
    /// A webhook caller holding the webhook secret.
    Webhook,
}

impl AuthScope {
    fn from_parts(parts: &Parts) -> Option<&Self> {
        parts.extensions.get::<Self>()
    }
}

fn missing_scope() -> Error<'static> {
    ErrorKind::AuthenticationFailed.into_error()
}

/// The community a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityAuth(pub Community);

impl<S> FromRequestParts<S> for CommunityAuth
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match AuthScope::from_parts(parts) {
            Some(AuthScope::Community(community)) => Ok(Self(community.clone())),
            _ => Err(missing_scope()),
        }
    }
}

/// Proof that a request was authenticated as root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootAuth;

impl<S> FromRequestParts<S> for RootAuth
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match AuthScope::from_parts(parts) {
            Some(AuthScope::Root) => Ok(Self),
            _ => Err(missing_scope()),
        }
    }
}

/// Proof that a request carried the webhook secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookAuth;

impl<S> FromRequestParts<S> for WebhookAuth
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match AuthScope::from_parts(parts) {
            Some(AuthScope::Webhook) => Ok(Self),
            _ => Err(missing_scope()),
        }
    }
}
