//! Cache errors.
//!
//! None of these reach a client: the negotiator degrades to memory when the
//! distributed cache is unreachable, and view reads treat a failing cache as
//! a miss.

use std::error::Error as StdError;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The NATS server could not be reached or dropped the connection.
    #[error("cache server unreachable: {0}")]
    Unreachable(#[source] Box<dyn StdError + Send + Sync>),

    /// A cached view could not be encoded or decoded.
    #[error("cached value is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),

    /// The NATS server did not answer in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// A key-value bucket call failed.
    #[error("{operation} failed: {details}")]
    Kv {
        operation: &'static str,
        details: String,
    },
}

impl Error {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    pub fn unreachable(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Unreachable(Box::new(source))
    }

    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    pub fn kv(operation: &'static str, details: impl ToString) -> Self {
        Self::Kv {
            operation,
            details: details.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_names_the_operation() {
        let error = Error::timeout("connect", Duration::from_secs(5));
        assert_eq!(error.to_string(), "connect timed out after 5s");
    }
}
