use sqlmatches_storage::StorageError;

use crate::model::DemoStatus;
use crate::queue::QueueError;
use crate::repository::RepositoryError;

/// Result type for demo lifecycle operations.
pub type DemoResult<T> = Result<T, DemoError>;

/// Failures of the demo upload pipeline and the lifecycle tasks around it.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// The match id is already open.
    #[error("match '{0}' is already open")]
    DuplicateMatch(String),

    /// No open match with this id belongs to the caller.
    #[error("match '{0}' does not exist or no longer accepts a demo")]
    UnknownMatch(String),

    /// The match already has a demo, or one is being transferred.
    #[error("a demo for match '{0}' was already uploaded")]
    DemoAlreadyUploaded(String),

    /// The declared size exceeds what the community may upload.
    #[error("demo of {size} bytes exceeds the {limit} byte limit")]
    DemoTooLarge { size: u64, limit: u64 },

    /// The storage backend could not be reached, even after reauthorizing.
    #[error("storage backend unavailable")]
    BackendUnavailable(#[source] StorageError),

    /// The storage backend failed the transfer.
    #[error("demo upload failed")]
    UploadFailed(#[source] StorageError),

    /// No storage backend is configured.
    #[error("demo uploads are disabled")]
    UploadsDisabled,

    /// The match is not open.
    #[error("match '{0}' is not open")]
    MatchNotOpen(String),

    /// The demo status does not allow the requested transition.
    #[error("demo in state '{from}' does not allow this operation")]
    InvalidTransition { from: DemoStatus },

    /// The transfer task stopped before it recorded an outcome.
    #[error("demo transfer was interrupted")]
    TransferInterrupted(#[source] tokio::task::JoinError),

    /// The match store failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl DemoError {
    /// Sorts a backend failure into unavailable or terminal.
    pub(crate) fn from_storage(err: StorageError) -> Self {
        if err.is_unavailable() {
            Self::BackendUnavailable(err)
        } else {
            Self::UploadFailed(err)
        }
    }
}

impl From<QueueError> for DemoError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::DuplicateMatch(id) => Self::DuplicateMatch(id),
            QueueError::UnknownMatch(id) => Self::UnknownMatch(id),
        }
    }
}
