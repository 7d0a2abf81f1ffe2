//! Amazon S3 backend.

use async_trait::async_trait;
use opendal::{ErrorKind, Operator, services};

use crate::TRACING_TARGET;
use crate::backend::{BackendKind, StorageBackend};
use crate::config::S3Config;
use crate::descriptor::{StoredLocation, UploadDescriptor, collect_body};
use crate::error::{StorageError, StorageResult};

/// Whole-object storage on S3 or an S3-compatible service.
///
/// Each upload is buffered in full before the single put, so payloads are
/// capped at [`S3Config::max_object_size`].
#[derive(Clone)]
pub struct S3Backend {
    operator: Operator,
    config: S3Config,
}

impl S3Backend {
    /// Builds the operator. No request is made until the first upload.
    pub fn new(config: S3Config) -> StorageResult<Self> {
        let mut builder = services::S3::default()
            .bucket(&config.bucket)
            .region(&config.region)
            .access_key_id(&config.access_key_id)
            .secret_access_key(&config.secret_access_key);

        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map(|op| op.finish())
            .map_err(|e| StorageError::init(e.to_string()))?;

        tracing::info!(
            target: TRACING_TARGET,
            bucket = %config.bucket,
            region = %config.region,
            max_object_size = config.max_object_size,
            "S3 storage buffers whole demos in memory"
        );

        Ok(Self { operator, config })
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::WholeObject
    }

    fn extension(&self) -> &str {
        &self.config.extension
    }

    fn max_object_size(&self) -> Option<u64> {
        Some(self.config.max_object_size)
    }

    async fn upload(&self, descriptor: UploadDescriptor) -> StorageResult<StoredLocation> {
        let key = descriptor.object_key();
        let expected = descriptor.content_length();

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            size = expected,
            "Buffering demo for S3"
        );

        let bytes = collect_body(descriptor.into_body(), expected, self.config.max_object_size).await?;
        self.operator.write(&key, bytes).await?;

        tracing::debug!(target: TRACING_TARGET, key = %key, "S3 upload complete");

        Ok(StoredLocation::new(key))
    }

    async fn delete(&self, location: &StoredLocation) -> StorageResult<()> {
        match self.operator.delete(&location.key).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve_url(&self, location: &StoredLocation) -> String {
        format!("{}{}", self.config.public_base(), location.key)
    }
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.config.bucket)
            .field("region", &self.config.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn backend() -> anyhow::Result<S3Backend> {
        let config = S3Config::new("demos", "eu-west-1", "ak", "sk")
            .with_endpoint("http://127.0.0.1:1")
            .with_public_base_url("https://cdn.example.com")
            .with_max_object_size(64);
        Ok(S3Backend::new(config)?)
    }

    #[test]
    fn resolves_public_urls() -> anyhow::Result<()> {
        let backend = backend()?;
        let location = StoredLocation::new("c1/m1.dem.bz2");

        assert_eq!(backend.kind(), BackendKind::WholeObject);
        assert_eq!(backend.max_object_size(), Some(64));
        assert_eq!(
            backend.resolve_url(&location),
            "https://cdn.example.com/c1/m1.dem.bz2"
        );
        Ok(())
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_transfer() -> anyhow::Result<()> {
        let backend = backend()?;
        let descriptor =
            UploadDescriptor::from_bytes("c1", "m1", ".dem.bz2", Bytes::from(vec![0u8; 65]))?;

        let err = backend.upload(descriptor).await.unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { size: 65, limit: 64 }));
        Ok(())
    }
}
