//! Demo storage backend selection.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Result as AnyhowResult, anyhow};
use clap::{Args, ValueEnum};
use sqlmatches_storage::{
    B2Config, DEFAULT_DEMO_EXTENSION, LocalConfig, S3Config, StorageConfig,
};

const MEGABYTE: u64 = 1024 * 1024;

/// Storage backend chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// Demo uploads are disabled.
    None,
    /// Local directory, for development.
    Local,
    /// Backblaze B2.
    B2,
    /// Amazon S3 compatible storage.
    S3,
}

impl StorageKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Local => "local",
            Self::B2 => "b2",
            Self::S3 => "s3",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage arguments. Only the fields of the selected backend are read.
#[derive(Debug, Clone, Args)]
#[must_use = "config does nothing unless you use it"]
pub struct StorageArgs {
    /// Storage backend for demos
    #[arg(long, env = "STORAGE_BACKEND", value_enum, default_value_t = StorageKind::None)]
    pub storage_backend: StorageKind,

    /// Extension appended to every stored demo
    #[arg(long, env = "DEMO_EXTENSION", default_value = DEFAULT_DEMO_EXTENSION)]
    pub demo_extension: String,

    /// Directory demos are written to by the local backend
    #[arg(long, env = "LOCAL_DIRECTORY", default_value = "demos")]
    pub local_directory: PathBuf,

    /// Public URL of this server, used for local demo links
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:3000")]
    pub public_base_url: String,

    /// B2 application key id
    #[arg(long, env = "B2_KEY_ID")]
    pub b2_key_id: Option<String>,

    /// B2 application key
    #[arg(long, env = "B2_APP_KEY", hide_env_values = true)]
    pub b2_app_key: Option<String>,

    /// B2 bucket id
    #[arg(long, env = "B2_BUCKET_ID")]
    pub b2_bucket_id: Option<String>,

    /// Prefix inside the B2 bucket
    #[arg(long, env = "B2_PATHWAY", default_value = "")]
    pub b2_pathway: String,

    /// Public CDN URL B2 demos are served from
    #[arg(long, env = "B2_CDN_URL")]
    pub b2_cdn_url: Option<String>,

    /// Segment size in megabytes for B2 large-file uploads
    #[arg(long, env = "B2_PART_SIZE", default_value_t = 5)]
    pub b2_part_size_mb: u64,

    /// S3 bucket name
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// S3 region
    #[arg(long, env = "S3_REGION", default_value = "us-east-1")]
    pub s3_region: String,

    /// Custom S3 endpoint, for compatible providers
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// S3 access key id
    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: Option<String>,

    /// S3 secret access key
    #[arg(long, env = "S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,

    /// Public URL S3 demos are served from
    #[arg(long, env = "S3_PUBLIC_URL")]
    pub s3_public_url: Option<String>,

    /// Largest demo in megabytes the S3 backend buffers
    #[arg(long, env = "S3_MAX_OBJECT_SIZE", default_value_t = 100)]
    pub s3_max_object_size_mb: u64,
}

impl StorageArgs {
    /// Validates that the selected backend has everything it needs.
    pub fn validate(&self) -> AnyhowResult<()> {
        if !self.demo_extension.starts_with('.') {
            return Err(anyhow!(
                "demo extension '{}' must start with '.'",
                self.demo_extension
            ));
        }
        self.to_config().map(|_| ())
    }

    /// Builds the storage configuration for the selected backend.
    pub fn to_config(&self) -> AnyhowResult<StorageConfig> {
        let config = match self.storage_backend {
            StorageKind::None => StorageConfig::None,
            StorageKind::Local => StorageConfig::Local(
                LocalConfig::new(self.local_directory.clone(), self.public_base_url.as_str())
                    .with_extension(self.demo_extension.as_str()),
            ),
            StorageKind::B2 => {
                let part_size = usize::try_from(self.b2_part_size_mb.saturating_mul(MEGABYTE))
                    .map_err(|_| anyhow!("B2 part size is too large"))?;

                StorageConfig::B2(
                    B2Config::new(
                        required(&self.b2_key_id, "--b2-key-id")?,
                        required(&self.b2_app_key, "--b2-app-key")?,
                        required(&self.b2_bucket_id, "--b2-bucket-id")?,
                        &self.b2_pathway,
                        required(&self.b2_cdn_url, "--b2-cdn-url")?,
                    )
                    .with_extension(self.demo_extension.as_str())
                    .with_part_size(part_size),
                )
            }
            StorageKind::S3 => {
                if !cfg!(feature = "s3") {
                    return Err(anyhow!("S3 storage requires the `s3` feature"));
                }

                let mut s3 = S3Config::new(
                    required(&self.s3_bucket, "--s3-bucket")?,
                    self.s3_region.as_str(),
                    required(&self.s3_access_key_id, "--s3-access-key-id")?,
                    required(&self.s3_secret_access_key, "--s3-secret-access-key")?,
                )
                .with_extension(self.demo_extension.as_str())
                .with_max_object_size(self.s3_max_object_size_mb.saturating_mul(MEGABYTE));

                if let Some(endpoint) = &self.s3_endpoint {
                    s3 = s3.with_endpoint(endpoint.as_str());
                }
                if let Some(url) = &self.s3_public_url {
                    s3 = s3.with_public_base_url(url.as_str());
                }
                StorageConfig::S3(s3)
            }
        };

        Ok(config)
    }
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> AnyhowResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(anyhow!("{flag} is required for the selected storage backend")),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[clap(flatten)]
        storage: StorageArgs,
    }

    fn parse(args: &[&str]) -> anyhow::Result<StorageArgs> {
        let argv = std::iter::once("sqlmatches").chain(args.iter().copied());
        Ok(Harness::try_parse_from(argv)?.storage)
    }

    #[test]
    fn local_defaults_to_demos_directory() -> anyhow::Result<()> {
        let args = parse(&["--storage-backend", "local"])?;
        let StorageConfig::Local(local) = args.to_config()? else {
            anyhow::bail!("expected the local backend");
        };

        assert_eq!(local.directory, PathBuf::from("demos"));
        assert_eq!(local.extension, ".dem.bz2");
        Ok(())
    }

    #[test]
    fn b2_normalizes_pathway_and_cdn_url() -> anyhow::Result<()> {
        let args = parse(&[
            "--storage-backend",
            "b2",
            "--b2-key-id",
            "key",
            "--b2-app-key",
            "secret",
            "--b2-bucket-id",
            "bucket",
            "--b2-pathway",
            "/sqlmatches/demos/",
            "--b2-cdn-url",
            "https://cdn.example.com",
        ])?;
        let StorageConfig::B2(b2) = args.to_config()? else {
            anyhow::bail!("expected the b2 backend");
        };

        assert_eq!(b2.pathway, "sqlmatches/demos");
        assert_eq!(b2.cdn_url, "https://cdn.example.com/");
        Ok(())
    }

    #[test]
    fn b2_requires_credentials() -> anyhow::Result<()> {
        let args = parse(&["--storage-backend", "b2", "--b2-key-id", "key"])?;
        let error = args.validate().err().map(|e| e.to_string());
        assert_eq!(
            error.as_deref(),
            Some("--b2-app-key is required for the selected storage backend")
        );
        Ok(())
    }

    #[test]
    fn rejects_extension_without_dot() -> anyhow::Result<()> {
        let args = parse(&["--storage-backend", "none", "--demo-extension", "dem"])?;
        assert!(args.validate().is_err());
        Ok(())
    }
}
