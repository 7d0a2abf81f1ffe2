//! Demo lifecycle, queue and repository errors to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};
use crate::pipeline::DemoError;
use crate::queue::QueueError;
use crate::repository::RepositoryError;

impl From<DemoError> for HttpError<'static> {
    fn from(error: DemoError) -> Self {
        match error {
            DemoError::DuplicateMatch(id) => ErrorKind::DuplicateMatch
                .with_resource("match")
                .with_context(id),
            DemoError::UnknownMatch(id) => ErrorKind::UnknownMatch
                .with_resource("match")
                .with_context(id),
            DemoError::DemoAlreadyUploaded(id) => ErrorKind::DemoAlreadyUploaded
                .with_resource("demo")
                .with_context(id),
            DemoError::DemoTooLarge { size, limit } => ErrorKind::DemoTooLarge
                .with_resource("demo")
                .with_context(format!("declared {size} bytes, limit {limit}")),
            DemoError::BackendUnavailable(source) => ErrorKind::BackendUnavailable
                .with_resource("demo")
                .with_context(source.to_string()),
            DemoError::UploadFailed(source) => ErrorKind::UploadFailed
                .with_resource("demo")
                .with_context(source.to_string()),
            DemoError::UploadsDisabled => ErrorKind::UploadsDisabled.with_resource("demo"),
            DemoError::MatchNotOpen(id) => ErrorKind::MatchNotOpen
                .with_resource("match")
                .with_context(id),
            DemoError::InvalidTransition { from } => ErrorKind::InvalidTransition
                .with_resource("demo")
                .with_context(format!("demo status is {from}")),
            DemoError::TransferInterrupted(source) => ErrorKind::InternalServerError
                .with_resource("demo")
                .with_context(source.to_string()),
            DemoError::Repository(source) => source.into(),
        }
    }
}

impl From<QueueError> for HttpError<'static> {
    fn from(error: QueueError) -> Self {
        DemoError::from(error).into()
    }
}

impl From<RepositoryError> for HttpError<'static> {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict { entity, .. } => ErrorKind::BadRequest
                .with_message("Resource already exists")
                .with_resource(entity)
                .with_context(error.to_string()),
            RepositoryError::NotFound { entity, .. } => ErrorKind::NotFound
                .with_resource(entity)
                .with_context(error.to_string()),
            RepositoryError::Backend(_) => {
                ErrorKind::InternalServerError.with_context(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use sqlmatches_storage::StorageError;

    use super::*;

    #[test]
    fn storage_failures_keep_their_category() {
        let unavailable: HttpError =
            DemoError::BackendUnavailable(StorageError::unavailable("down")).into();
        assert_eq!(unavailable.kind(), ErrorKind::BackendUnavailable);

        let failed: HttpError = DemoError::UploadFailed(StorageError::write("disk full")).into();
        assert_eq!(failed.kind().status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn queue_errors_convert_through_demo_errors() {
        let error: HttpError = QueueError::UnknownMatch("m".to_owned()).into();
        assert_eq!(error.kind(), ErrorKind::UnknownMatch);
        assert_eq!(error.context(), Some("m"));
    }
}
