//! Local disk backend.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::TRACING_TARGET;
use crate::backend::{BackendKind, StorageBackend};
use crate::config::{LOCAL_MOUNT_PATH, LocalConfig};
use crate::descriptor::{StoredLocation, UploadDescriptor};
use crate::error::{StorageError, StorageResult};

/// Writes demos into a directory on the local filesystem.
///
/// Each upload streams into a temp file in a staging directory beside the
/// served one and is renamed into place once fully written and synced, so
/// partial demos are never reachable under the public mount.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    config: LocalConfig,
    staging: PathBuf,
}

impl LocalBackend {
    /// Creates the backend, creating the storage and staging directories if
    /// missing.
    pub async fn new(config: LocalConfig) -> StorageResult<Self> {
        fs::create_dir_all(&config.directory).await.map_err(|e| {
            StorageError::init(format!(
                "cannot create demo directory {}: {e}",
                config.directory.display()
            ))
        })?;

        let staging = staging_directory(&config.directory).await?;
        fs::create_dir_all(&staging).await.map_err(|e| {
            StorageError::init(format!(
                "cannot create staging directory {}: {e}",
                staging.display()
            ))
        })?;

        tracing::warn!(
            target: TRACING_TARGET,
            directory = %config.directory.display(),
            staging = %staging.display(),
            "Using local storage for demos, use b2 for production."
        );

        Ok(Self { config, staging })
    }

    /// Returns the storage directory.
    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.config.directory.clone(), |path, segment| path.join(segment))
    }

    async fn write_temp(
        &self,
        temp_path: &Path,
        descriptor: UploadDescriptor,
    ) -> StorageResult<()> {
        let expected = descriptor.content_length();
        let mut body = descriptor.into_body();
        let mut file = fs::File::create(temp_path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = body.try_next().await? {
            written += chunk.len() as u64;
            if written > expected {
                return Err(StorageError::LengthMismatch {
                    expected,
                    actual: written,
                });
            }
            file.write_all(&chunk).await?;
        }

        if written != expected {
            return Err(StorageError::LengthMismatch {
                expected,
                actual: written,
            });
        }

        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn extension(&self) -> &str {
        &self.config.extension
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.config.directory)
    }

    async fn upload(&self, descriptor: UploadDescriptor) -> StorageResult<StoredLocation> {
        let key = descriptor.object_key();
        let path = self.path_for(&key);
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.directory.clone());

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            size = descriptor.content_length(),
            "Writing demo"
        );

        fs::create_dir_all(&parent).await?;
        let temp_path = self.staging.join(format!("{}.tmp", Uuid::new_v4()));

        if let Err(err) = self.write_temp(&temp_path, descriptor).await {
            remove_partial(&temp_path).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&temp_path, &path).await {
            remove_partial(&temp_path).await;
            return Err(err.into());
        }

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            "Demo write complete"
        );

        Ok(StoredLocation::new(key))
    }

    async fn delete(&self, location: &StoredLocation) -> StorageResult<()> {
        let path = self.path_for(&location.key);

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            "Deleting demo"
        );

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::delete(err.to_string())),
        }
    }

    fn resolve_url(&self, location: &StoredLocation) -> String {
        format!(
            "{}{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            LOCAL_MOUNT_PATH,
            location.key
        )
    }
}

/// `<parent>/.<name>.partial` for a served directory `<parent>/<name>`.
async fn staging_directory(directory: &Path) -> StorageResult<PathBuf> {
    let directory = fs::canonicalize(directory).await.map_err(|e| {
        StorageError::init(format!(
            "cannot resolve demo directory {}: {e}",
            directory.display()
        ))
    })?;

    match (directory.parent(), directory.file_name()) {
        (Some(parent), Some(name)) => {
            Ok(parent.join(format!(".{}.partial", name.to_string_lossy())))
        }
        _ => Err(StorageError::init(format!(
            "demo directory {} has no parent to stage uploads in",
            directory.display()
        ))),
    }
}

async fn remove_partial(temp_path: &Path) {
    if let Err(err) = fs::remove_file(temp_path).await
        && err.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(
            target: TRACING_TARGET,
            path = %temp_path.display(),
            error = %err,
            "Failed to remove partial demo"
        );
    }
}
