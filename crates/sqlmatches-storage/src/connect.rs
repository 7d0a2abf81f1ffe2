//! Backend selection at startup.

use std::sync::Arc;

use crate::TRACING_TARGET;
use crate::b2::B2Backend;
use crate::backend::StorageBackend;
use crate::config::StorageConfig;
use crate::error::StorageResult;
use crate::local::LocalBackend;

/// Builds the configured backend.
///
/// Returns `Ok(None)` when demo uploads are disabled. Any other
/// configuration that cannot be brought up is an error, and the process is
/// expected to refuse to start.
pub async fn connect(config: StorageConfig) -> StorageResult<Option<Arc<dyn StorageBackend>>> {
    let backend_name = config.backend_name();

    let backend: Arc<dyn StorageBackend> = match config {
        StorageConfig::None => {
            tracing::warn!(
                target: TRACING_TARGET,
                "No storage backend configured, demo uploads are disabled"
            );
            return Ok(None);
        }
        StorageConfig::Local(local) => Arc::new(LocalBackend::new(local).await?),
        StorageConfig::B2(b2) => Arc::new(B2Backend::connect(b2).await?),
        #[cfg(feature = "s3")]
        StorageConfig::S3(s3) => Arc::new(crate::s3::S3Backend::new(s3)?),
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3(_) => {
            return Err(crate::error::StorageError::init(
                "S3 storage requires the `s3` feature to be enabled",
            ));
        }
    };

    tracing::info!(
        target: TRACING_TARGET,
        backend = backend_name,
        kind = %backend.kind(),
        extension = backend.extension(),
        "Storage backend ready"
    );

    Ok(Some(backend))
}
