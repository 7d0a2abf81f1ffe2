//! The storage backend contract.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::descriptor::{StoredLocation, UploadDescriptor};
use crate::error::StorageResult;

/// Which variant is active for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Local disk.
    Local,
    /// Chunked remote object storage.
    Chunked,
    /// Whole-object remote storage.
    WholeObject,
}

impl BackendKind {
    /// Returns the kind as a string for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Chunked => "chunked",
            Self::WholeObject => "whole_object",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform upload, delete and addressing contract for demo storage.
///
/// An upload either fully succeeds, leaving an object reachable through
/// [`resolve_url`], or fails without leaving a partial object addressable.
/// Deleting a missing object is not an error.
///
/// [`resolve_url`]: StorageBackend::resolve_url
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// The backend variant.
    fn kind(&self) -> BackendKind;

    /// Extension appended to stored demos.
    fn extension(&self) -> &str;

    /// Largest payload this backend accepts, if it buffers whole objects.
    fn max_object_size(&self) -> Option<u64> {
        None
    }

    /// Directory holding stored objects, when they live on this machine and
    /// can be served as static files.
    fn local_root(&self) -> Option<&Path> {
        None
    }

    /// Transfers the descriptor's body and returns where it was stored.
    async fn upload(&self, descriptor: UploadDescriptor) -> StorageResult<StoredLocation>;

    /// Removes a stored object.
    async fn delete(&self, location: &StoredLocation) -> StorageResult<()>;

    /// Public address of a stored object.
    fn resolve_url(&self, location: &StoredLocation) -> String;
}
