//! Prelude module for convenient imports.

pub use crate::backend::{BackendKind, StorageBackend};
pub use crate::config::StorageConfig;
pub use crate::descriptor::{StoredLocation, UploadDescriptor};
pub use crate::error::{StorageError, StorageResult};
