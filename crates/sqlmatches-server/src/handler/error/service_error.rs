//! Service error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};
use crate::Error as ServiceError;

/// Service errors never carry a client-facing cause; the details stay in the
/// logged context.
impl From<ServiceError> for HttpError<'static> {
    fn from(error: ServiceError) -> Self {
        ErrorKind::InternalServerError
            .with_context(format!("{} ({})", error.message(), error.kind()))
    }
}
