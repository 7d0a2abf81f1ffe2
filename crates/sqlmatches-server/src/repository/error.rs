/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors returned by repository implementations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A record with the same key already exists.
    #[error("{entity} '{key}' already exists")]
    Conflict { entity: &'static str, key: String },

    /// The record does not exist.
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// The underlying store failed.
    #[error("repository backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn conflict(entity: &'static str, key: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            key: key.into(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}
