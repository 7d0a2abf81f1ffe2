use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// HTTP error body.
///
/// Serialized as `{name, message, resource?}`. The status code and the
/// internal context never reach the client.
#[must_use = "error responses do nothing unless serialized"]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse<'a> {
    /// The error name/type identifier
    pub name: Cow<'a, str>,
    /// User-friendly error message safe for client display
    pub message: Cow<'a, str>,
    /// The resource that the error relates to (optional, set by handler)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Cow<'a, str>>,
    /// Internal context for debugging (not exposed to client)
    #[serde(skip)]
    pub context: Option<Cow<'a, str>>,
    /// HTTP status code (not serialized in JSON)
    #[serde(skip)]
    pub status: StatusCode,
}

impl<'a> ErrorResponse<'a> {
    // 4xx Client Errors
    pub const AUTHENTICATION_FAILED: Self = Self::new(
        "authentication_failed",
        "Invalid basic auth credentials",
        StatusCode::UNAUTHORIZED,
    );
    pub const BAD_REQUEST: Self = Self::new(
        "bad_request",
        "The request could not be processed due to invalid data",
        StatusCode::BAD_REQUEST,
    );
    pub const COMMUNITY_NAME_INVALID: Self = Self::new(
        "community_name_invalid",
        "Community name invalid",
        StatusCode::BAD_REQUEST,
    );
    pub const COMMUNITY_NAME_TAKEN: Self = Self::new(
        "community_name_taken",
        "Community name taken",
        StatusCode::BAD_REQUEST,
    );
    pub const DEMO_ALREADY_UPLOADED: Self = Self::new(
        "demo_already_uploaded",
        "Demo already uploaded",
        StatusCode::BAD_REQUEST,
    );
    pub const DEMO_TOO_LARGE: Self = Self::new(
        "demo_too_large",
        "Demo exceeds the allowed size",
        StatusCode::PAYLOAD_TOO_LARGE,
    );
    pub const DUPLICATE_MATCH: Self = Self::new(
        "duplicate_match",
        "Match already open",
        StatusCode::CONFLICT,
    );
    pub const INVALID_COMMUNITY: Self = Self::new(
        "invalid_community",
        "Invalid community",
        StatusCode::NOT_FOUND,
    );
    pub const INVALID_TRANSITION: Self = Self::new(
        "invalid_transition",
        "Demo status does not allow this operation",
        StatusCode::CONFLICT,
    );
    pub const LENGTH_REQUIRED: Self = Self::new(
        "length_required",
        "Demo uploads require a Content-Length header",
        StatusCode::LENGTH_REQUIRED,
    );
    pub const MATCH_NOT_OPEN: Self = Self::new(
        "match_not_open",
        "Match is not open",
        StatusCode::CONFLICT,
    );
    pub const NOT_FOUND: Self = Self::new(
        "not_found",
        "The requested resource was not found",
        StatusCode::NOT_FOUND,
    );
    pub const UNKNOWN_MATCH: Self = Self::new(
        "unknown_match",
        "Invalid Match ID",
        StatusCode::NOT_FOUND,
    );

    // 5xx Server Errors
    pub const BACKEND_UNAVAILABLE: Self = Self::new(
        "backend_unavailable",
        "Storage backend unavailable",
        StatusCode::SERVICE_UNAVAILABLE,
    );
    pub const INTERNAL_SERVER_ERROR: Self = Self::new(
        "internal_server_error",
        "An internal server error occurred. Please try again later",
        StatusCode::INTERNAL_SERVER_ERROR,
    );
    pub const UPLOAD_FAILED: Self = Self::new(
        "upload_failed",
        "Demo upload failed",
        StatusCode::BAD_GATEWAY,
    );
    pub const UPLOADS_DISABLED: Self = Self::new(
        "uploads_disabled",
        "Demo uploads are disabled",
        StatusCode::NOT_IMPLEMENTED,
    );

    /// Creates a new error response.
    #[inline]
    pub const fn new(name: &'a str, message: &'a str, status: StatusCode) -> Self {
        Self {
            name: Cow::Borrowed(name),
            message: Cow::Borrowed(message),
            resource: None,
            context: None,
            status,
        }
    }

    /// Sets the resource. An existing resource is kept as a prefix.
    pub fn with_resource(mut self, resource: impl Into<Cow<'a, str>>) -> Self {
        let new_resource = resource.into();
        self.resource = Some(match self.resource {
            Some(existing) => Cow::Owned(format!("{}/{}", existing, new_resource)),
            None => new_resource,
        });
        self
    }

    /// Replaces the message.
    pub fn with_message(mut self, message: impl Into<Cow<'a, str>>) -> Self {
        self.message = message.into();
        self
    }

    /// Attaches context. Multiple contexts are joined with `; `.
    pub fn with_context(mut self, context: impl Into<Cow<'a, str>>) -> Self {
        let new_context = context.into();
        self.context = Some(match self.context {
            Some(existing) => Cow::Owned(format!("{}; {}", existing, new_context)),
            None => new_context,
        });
        self
    }
}

impl Default for ErrorResponse<'_> {
    #[inline]
    fn default() -> Self {
        Self::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ErrorResponse<'_> {
    #[inline]
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
