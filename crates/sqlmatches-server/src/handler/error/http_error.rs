//! HTTP error handling with builder pattern for dynamic error responses.

use std::borrow::Cow;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::TRACING_TARGET_HANDLER;
use crate::handler::response::ErrorResponse;

/// The error type for HTTP handlers.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless serialized"]
pub struct Error<'a> {
    kind: ErrorKind,
    context: Option<Cow<'a, str>>,
    message: Option<Cow<'a, str>>,
    resource: Option<Cow<'a, str>>,
}

impl Error<'static> {
    /// Creates a new [`Error`] with the specified kind.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
            message: None,
            resource: None,
        }
    }
}

impl<'a> Error<'a> {
    /// Attaches context that is logged but never sent to the client.
    #[inline]
    pub fn with_context(self, context: impl Into<Cow<'a, str>>) -> Self {
        Self {
            context: Some(context.into()),
            ..self
        }
    }

    /// Replaces the kind's default message.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    /// Sets the resource that caused the error.
    #[inline]
    pub fn with_resource(self, resource: impl Into<Cow<'a, str>>) -> Self {
        Self {
            resource: Some(resource.into()),
            ..self
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[inline]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }
}

impl fmt::Display for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = self.kind.response();
        let message = self.message.as_deref().unwrap_or(response.message.as_ref());

        write!(f, "{} ({}): {}", response.name, response.status, message)?;

        if let Some(ref context) = self.context {
            write!(f, " - {}", context)?;
        }

        if let Some(ref resource) = self.resource {
            write!(f, " [resource: {}]", resource)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error<'_> {}

impl IntoResponse for Error<'_> {
    fn into_response(self) -> Response {
        let mut response = self.kind.response();

        if let Some(context) = self.context {
            if response.status.is_server_error() {
                tracing::error!(
                    target: TRACING_TARGET_HANDLER,
                    kind = %self.kind,
                    context = %context,
                    "Request failed"
                );
            } else {
                tracing::debug!(
                    target: TRACING_TARGET_HANDLER,
                    kind = %self.kind,
                    context = %context,
                    "Request rejected"
                );
            }
            response = response.with_context(context);
        }

        if let Some(message) = self.message {
            response = response.with_message(message);
        }

        if let Some(resource) = self.resource {
            response = response.with_resource(resource);
        }

        response.into_response()
    }
}

impl From<ErrorKind> for Error<'static> {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// A specialized [`Result`] type for HTTP handlers.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error<'static>> = std::result::Result<T, E>;

/// Every error a handler can answer with.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // 4xx Client Errors
    /// 400 Bad Request - Invalid request data
    BadRequest,
    /// 400 Bad Request - The match already has a demo
    DemoAlreadyUploaded,
    /// 400 Bad Request - Community id is not 4-32 alphanumerics
    CommunityNameInvalid,
    /// 400 Bad Request - Community id is registered
    CommunityNameTaken,
    /// 401 Unauthorized - Missing, malformed or wrong basic credentials
    AuthenticationFailed,
    /// 404 Not Found - Resource not found
    NotFound,
    /// 404 Not Found - No such match for this community
    UnknownMatch,
    /// 404 Not Found - No such community
    InvalidCommunity,
    /// 409 Conflict - Match id already open
    DuplicateMatch,
    /// 409 Conflict - Match is not open
    MatchNotOpen,
    /// 409 Conflict - Demo cannot be resubmitted
    InvalidTransition,
    /// 411 Length Required - Demo upload without a length
    LengthRequired,
    /// 413 Payload Too Large - Demo exceeds the allowance
    DemoTooLarge,

    // 5xx Server Errors
    /// 500 Internal Server Error - Unexpected server error
    #[default]
    InternalServerError,
    /// 501 Not Implemented - No storage backend configured
    UploadsDisabled,
    /// 502 Bad Gateway - Storage backend failed the transfer
    UploadFailed,
    /// 503 Service Unavailable - Storage backend unreachable
    BackendUnavailable,
}

impl ErrorKind {
    /// Converts this error kind into a full [`Error`].
    #[inline]
    pub fn into_error(self) -> Error<'static> {
        Error::new(self)
    }

    /// Creates an [`Error`] with the specified context.
    #[inline]
    pub fn with_context<'a>(self, context: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_context(context)
    }

    /// Creates an [`Error`] with the specified message.
    #[inline]
    pub fn with_message<'a>(self, message: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_message(message)
    }

    /// Creates an [`Error`] with the specified resource.
    #[inline]
    pub fn with_resource<'a>(self, resource: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_resource(resource)
    }

    /// Returns the HTTP status code for this error kind.
    #[inline]
    pub fn status_code(self) -> StatusCode {
        self.response().status
    }

    /// Returns the response template for this error kind.
    #[inline]
    pub fn response(self) -> ErrorResponse<'static> {
        match self {
            Self::BadRequest => ErrorResponse::BAD_REQUEST,
            Self::DemoAlreadyUploaded => ErrorResponse::DEMO_ALREADY_UPLOADED,
            Self::CommunityNameInvalid => ErrorResponse::COMMUNITY_NAME_INVALID,
            Self::CommunityNameTaken => ErrorResponse::COMMUNITY_NAME_TAKEN,
            Self::AuthenticationFailed => ErrorResponse::AUTHENTICATION_FAILED,
            Self::NotFound => ErrorResponse::NOT_FOUND,
            Self::UnknownMatch => ErrorResponse::UNKNOWN_MATCH,
            Self::InvalidCommunity => ErrorResponse::INVALID_COMMUNITY,
            Self::DuplicateMatch => ErrorResponse::DUPLICATE_MATCH,
            Self::MatchNotOpen => ErrorResponse::MATCH_NOT_OPEN,
            Self::InvalidTransition => ErrorResponse::INVALID_TRANSITION,
            Self::LengthRequired => ErrorResponse::LENGTH_REQUIRED,
            Self::DemoTooLarge => ErrorResponse::DEMO_TOO_LARGE,
            Self::InternalServerError => ErrorResponse::INTERNAL_SERVER_ERROR,
            Self::UploadsDisabled => ErrorResponse::UPLOADS_DISABLED,
            Self::UploadFailed => ErrorResponse::UPLOAD_FAILED,
            Self::BackendUnavailable => ErrorResponse::BACKEND_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.response().name.as_ref())
    }
}

impl IntoResponse for ErrorKind {
    #[inline]
    fn into_response(self) -> Response {
        self.into_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_expected_statuses() {
        assert_eq!(ErrorKind::UnknownMatch.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::DemoAlreadyUploaded.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::DemoTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            ErrorKind::BackendUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ErrorKind::UploadFailed.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorKind::AuthenticationFailed.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn display_prefers_custom_message() {
        let error = ErrorKind::BadRequest
            .with_message("map must not be empty")
            .with_resource("match");
        assert_eq!(
            error.to_string(),
            "bad_request (400 Bad Request): map must not be empty [resource: match]"
        );
    }

    #[test]
    fn response_keeps_status() {
        let response = ErrorKind::DuplicateMatch.with_context("m1").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
