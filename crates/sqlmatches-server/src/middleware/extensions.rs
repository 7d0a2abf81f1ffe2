//! Extension traits for `axum::Router` to apply middleware layers.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Request, Response, header};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::TRACING_TARGET_HANDLER;
use crate::middleware::error_handling::{catch_panic, handle_error};

/// Extension trait for `axum::`[`Router`] for layering middleware.
pub trait RouterExt<S> {
    /// Turns timeouts, panics and other tower errors into JSON error
    /// responses. Demo uploads run inside the same timeout, so it bounds the
    /// slowest transfer the server will wait for.
    fn with_error_handling_layer(self, timeout: Duration) -> Self;

    /// Opens one span per request and logs its status and latency.
    /// `Authorization` is marked sensitive first, so Basic credentials never
    /// reach a log line.
    fn with_observability_layer(self) -> Self;
}

impl<S> RouterExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_error_handling_layer(self, timeout: Duration) -> Self {
        self.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_error))
                .layer(CatchPanicLayer::custom(catch_panic))
                .layer(TimeoutLayer::new(timeout)),
        )
    }

    fn with_observability_layer(self) -> Self {
        let trace = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            })
            .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::debug!(
                    target: TRACING_TARGET_HANDLER,
                    status = response.status().as_u16(),
                    latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    "Request completed"
                );
            });

        self.layer(trace)
            .layer(SetSensitiveRequestHeadersLayer::new([header::AUTHORIZATION]))
    }
}
