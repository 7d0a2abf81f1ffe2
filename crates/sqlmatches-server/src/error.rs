//! Service-level errors.
//!
//! These cover startup and background failures: bad configuration, secret
//! hashing, and repositories that refuse a write outside a request's normal
//! outcomes. Request-level failures use the HTTP error in [`crate::handler`].

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use crate::repository::RepositoryError;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for service operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What went wrong, at the granularity callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A configured value is missing or unusable.
    Config,
    /// A secret could not be hashed or a verifier could not be built.
    Credentials,
    /// A repository failed underneath a service call.
    Repository,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Credentials => "credentials",
            Self::Repository => "repository",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service error with a kind, a human-readable message and an optional cause.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn credentials(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Credentials, message)
    }

    pub fn repository(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Repository, message)
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        Self::repository(err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let error = Error::config("free upload size exceeds the maximum");
        assert_eq!(
            error.to_string(),
            "config error: free upload size exceeds the maximum"
        );
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn repository_errors_keep_their_cause() {
        let error: Error = RepositoryError::Backend("disk full".into()).into();
        assert_eq!(error.kind(), ErrorKind::Repository);
        assert!(StdError::source(&error).is_some());
    }
}
