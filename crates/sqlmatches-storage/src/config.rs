//! Storage configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default extension appended to every stored demo.
pub const DEFAULT_DEMO_EXTENSION: &str = ".dem.bz2";

/// Default segment size for chunked uploads (5 MB).
pub const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;

/// Default cap for whole-object uploads (100 MB).
pub const DEFAULT_MAX_OBJECT_SIZE: u64 = 100 * 1024 * 1024;

/// Path the local storage directory is served under.
pub const LOCAL_MOUNT_PATH: &str = "/demos";

/// Storage backend selection, chosen once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Demo uploads are disabled.
    None,
    /// Local disk, for development.
    Local(LocalConfig),
    /// Backblaze B2, chunked transfer.
    B2(B2Config),
    /// Amazon S3 compatible storage, whole-object transfer.
    S3(S3Config),
}

impl StorageConfig {
    /// Returns the backend name as a static string.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Local(_) => "local",
            Self::B2(_) => "b2",
            Self::S3(_) => "s3",
        }
    }
}

/// Local disk configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory demos are written to. Created if missing.
    pub directory: PathBuf,
    /// Public base URL of this server, used to build demo links.
    pub public_base_url: String,
    /// Extension appended to stored demos.
    pub extension: String,
}

impl LocalConfig {
    /// Creates a new local configuration.
    pub fn new(directory: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            public_base_url: public_base_url.into(),
            extension: DEFAULT_DEMO_EXTENSION.to_owned(),
        }
    }

    /// Sets the demo extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

/// Backblaze B2 configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2Config {
    /// Application key id.
    pub key_id: String,
    /// Application key.
    pub application_key: String,
    /// Bucket demos are uploaded to.
    pub bucket_id: String,
    /// Prefix inside the bucket, without leading or trailing `/`.
    pub pathway: String,
    /// Public URL demos are served from, always ending with `/`.
    pub cdn_url: String,
    /// Extension appended to stored demos.
    pub extension: String,
    /// Segment size for large-file uploads.
    pub part_size: usize,
    /// Authorization endpoint.
    pub authorize_url: String,
}

impl B2Config {
    /// Creates a new B2 configuration, normalizing the pathway and CDN URL.
    pub fn new(
        key_id: impl Into<String>,
        application_key: impl Into<String>,
        bucket_id: impl Into<String>,
        pathway: &str,
        cdn_url: &str,
    ) -> Self {
        let cdn_url = if cdn_url.ends_with('/') {
            cdn_url.to_owned()
        } else {
            format!("{cdn_url}/")
        };

        Self {
            key_id: key_id.into(),
            application_key: application_key.into(),
            bucket_id: bucket_id.into(),
            pathway: pathway.trim_matches('/').to_owned(),
            cdn_url,
            extension: DEFAULT_DEMO_EXTENSION.to_owned(),
            part_size: DEFAULT_PART_SIZE,
            authorize_url: "https://api.backblazeb2.com/b2api/v2/b2_authorize_account".to_owned(),
        }
    }

    /// Sets the demo extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Sets the segment size. B2 rejects parts below 5 MB, so smaller values
    /// are raised to the default.
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(DEFAULT_PART_SIZE);
        self
    }

    /// Returns the full object name for a key, prefixed with the pathway.
    pub fn object_name(&self, key: &str) -> String {
        if self.pathway.is_empty() {
            key.to_owned()
        } else {
            format!("{}/{}", self.pathway, key)
        }
    }
}

/// Amazon S3 configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Config {
    /// Bucket name.
    pub bucket: String,
    /// AWS region.
    pub region: String,
    /// Custom endpoint URL (for S3-compatible storage like MinIO, R2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Public URL demos are served from. Defaults to the virtual-hosted bucket URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
    /// Extension appended to stored demos.
    pub extension: String,
    /// Largest object accepted; the whole payload is held in memory.
    pub max_object_size: u64,
}

impl S3Config {
    /// Creates a new S3 configuration.
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            public_base_url: None,
            extension: DEFAULT_DEMO_EXTENSION.to_owned(),
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
        }
    }

    /// Sets the custom endpoint (for S3-compatible storage).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the public URL demos are served from.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    /// Sets the demo extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Sets the largest accepted object.
    pub fn with_max_object_size(mut self, max_object_size: u64) -> Self {
        self.max_object_size = max_object_size;
        self
    }

    /// Returns the public base URL, always ending with `/`.
    pub fn public_base(&self) -> String {
        let base = match &self.public_base_url {
            Some(url) => url.clone(),
            None => format!("https://{}.s3.{}.amazonaws.com/", self.bucket, self.region),
        };

        if base.ends_with('/') { base } else { format!("{base}/") }
    }
}
