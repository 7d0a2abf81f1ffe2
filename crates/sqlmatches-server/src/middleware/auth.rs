//! Basic-auth gate for root, community and webhook routes.
//!
//! Every failure answers with the same 401 whatever went wrong: no header,
//! undecodable credentials, unknown community or a wrong secret.

use axum::Router;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::Response;
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::{Authorization, HeaderMapExt};

use crate::TRACING_TARGET_AUTH;
use crate::extract::AuthScope;
use crate::handler::{ErrorKind, Result};
use crate::service::ServiceState;

/// Extension trait for `axum::`[`Router`] to apply the auth gate.
pub trait RouterAuthExt<S> {
    /// Requires the root secret on all routes.
    fn with_root_authentication(self, state: ServiceState) -> Self;

    /// Requires a community id and API key on all routes.
    fn with_community_authentication(self, state: ServiceState) -> Self;

    /// Requires the webhook secret on all routes.
    fn with_webhook_authentication(self, state: ServiceState) -> Self;
}

impl<S> RouterAuthExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_root_authentication(self, state: ServiceState) -> Self {
        self.route_layer(from_fn_with_state(state, require_root))
    }

    fn with_community_authentication(self, state: ServiceState) -> Self {
        self.route_layer(from_fn_with_state(state, require_community))
    }

    fn with_webhook_authentication(self, state: ServiceState) -> Self {
        self.route_layer(from_fn_with_state(state, require_webhook))
    }
}

/// Requires the root secret in the password field.
pub async fn require_root(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let credentials = basic_credentials(request.headers())?;
    if !state
        .credential_verifier
        .verify(credentials.password(), state.secrets.root())
    {
        return Err(rejected("root"));
    }

    run_as(AuthScope::Root, request, next).await
}

/// Requires `community id : API key` credentials.
pub async fn require_community(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let credentials = basic_credentials(request.headers())?;
    let community = state
        .community_service
        .authenticate(credentials.username(), credentials.password())
        .await?
        .ok_or_else(|| rejected("community"))?;

    tracing::debug!(
        target: TRACING_TARGET_AUTH,
        community_id = %community.community_id,
        "Community authenticated"
    );
    run_as(AuthScope::Community(community), request, next).await
}

/// Requires the webhook secret in the password field.
pub async fn require_webhook(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let credentials = basic_credentials(request.headers())?;
    if !state
        .credential_verifier
        .verify(credentials.password(), state.secrets.webhook())
    {
        return Err(rejected("webhook"));
    }

    run_as(AuthScope::Webhook, request, next).await
}

fn basic_credentials(headers: &HeaderMap) -> Result<Authorization<Basic>> {
    headers
        .typed_get::<Authorization<Basic>>()
        .ok_or_else(|| rejected("missing or malformed header"))
}

fn rejected(reason: &'static str) -> crate::handler::Error<'static> {
    tracing::debug!(target: TRACING_TARGET_AUTH, reason, "Basic auth rejected");
    ErrorKind::AuthenticationFailed.into_error()
}

async fn run_as(scope: AuthScope, mut request: Request, next: Next) -> Result<Response> {
    request.extensions_mut().insert(scope);
    Ok(next.run(request).await)
}
