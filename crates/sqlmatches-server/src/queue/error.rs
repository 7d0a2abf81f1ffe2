/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors returned by [`PendingQueue`](super::PendingQueue).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The match id is already open.
    #[error("match '{0}' is already open")]
    DuplicateMatch(String),

    /// The match id is not open.
    #[error("match '{0}' is not open")]
    UnknownMatch(String),
}
