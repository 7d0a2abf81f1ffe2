#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod b2;
mod backend;
mod config;
mod connect;
mod descriptor;
mod error;
mod local;
#[cfg(feature = "s3")]
#[cfg_attr(docsrs, doc(cfg(feature = "s3")))]
mod s3;

#[doc(hidden)]
pub mod prelude;

pub use b2::B2Backend;
pub use backend::{BackendKind, StorageBackend};
pub use config::{
    B2Config, DEFAULT_DEMO_EXTENSION, DEFAULT_MAX_OBJECT_SIZE, DEFAULT_PART_SIZE, LOCAL_MOUNT_PATH,
    LocalConfig, S3Config, StorageConfig,
};
pub use connect::connect;
pub use descriptor::{ByteStream, PartReader, StoredLocation, UploadDescriptor};
pub use error::{StorageError, StorageResult};
pub use local::LocalBackend;
#[cfg(feature = "s3")]
pub use s3::S3Backend;

/// Tracing target for storage operations.
pub const TRACING_TARGET: &str = "sqlmatches_storage";
