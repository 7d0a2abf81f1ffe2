//! Cache configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// Default values
const DEFAULT_CLIENT_NAME: &str = "sqlmatches";
const DEFAULT_BUCKET: &str = "sqlmatches-views";
const DEFAULT_TTL_SECS: u64 = 3600;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

/// Configuration for the view cache.
///
/// Without `nats_url` the in-process cache is used directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct CacheConfig {
    /// NATS server URL (comma-separated for clustering)
    #[cfg_attr(feature = "config", arg(long = "nats-url", env = "NATS_URL"))]
    pub nats_url: Option<String>,

    /// Authentication token
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    pub nats_token: Option<String>,

    /// Key-value bucket holding cached views
    #[cfg_attr(
        feature = "config",
        arg(long = "cache-bucket", env = "CACHE_BUCKET", default_value = DEFAULT_BUCKET)
    )]
    pub cache_bucket: String,

    /// Lifetime of a cached entry in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "cache-ttl", env = "CACHE_TTL_SECS", default_value_t = DEFAULT_TTL_SECS)
    )]
    pub cache_ttl_secs: u64,

    /// Seconds to wait for NATS before falling back to the in-process cache
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cache-connect-timeout",
            env = "CACHE_CONNECT_TIMEOUT_SECS",
            default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
        )
    )]
    pub cache_connect_timeout_secs: u64,

    /// Drop every cached entry on startup
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cache-clear-on-startup",
            env = "CACHE_CLEAR_ON_STARTUP",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    pub cache_clear_on_startup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            nats_url: None,
            nats_token: None,
            cache_bucket: DEFAULT_BUCKET.to_owned(),
            cache_ttl_secs: DEFAULT_TTL_SECS,
            cache_connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            cache_clear_on_startup: true,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration pointing at a NATS server.
    pub fn nats(url: impl Into<String>) -> Self {
        Self {
            nats_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Set the authentication token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.nats_token = Some(token.into());
        self
    }

    /// Set the bucket name.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.cache_bucket = bucket.into();
        self
    }

    /// Set whether the cache is cleared on startup.
    #[must_use]
    pub fn with_clear_on_startup(mut self, clear: bool) -> Self {
        self.cache_clear_on_startup = clear;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.cache_connect_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Returns the client connection name.
    #[inline]
    pub fn client_name(&self) -> &str {
        DEFAULT_CLIENT_NAME
    }

    /// Returns the entry TTL.
    #[inline]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Returns the connection timeout.
    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_connect_timeout_secs)
    }

    /// Returns the ping interval.
    #[inline]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(DEFAULT_PING_INTERVAL_SECS)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.nats_url
            && url.trim().is_empty()
        {
            return Err(Error::invalid_config("NATS URL cannot be empty"));
        }

        if self.cache_bucket.is_empty()
            || !self
                .cache_bucket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_config(format!(
                "invalid cache bucket name '{}'",
                self.cache_bucket
            )));
        }

        if self.cache_ttl_secs == 0 {
            return Err(Error::invalid_config("cache TTL must be greater than zero"));
        }

        if self.cache_connect_timeout_secs == 0 {
            return Err(Error::invalid_config(
                "cache connect timeout must be greater than zero",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.cache_clear_on_startup);
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn rejects_bad_bucket_names() {
        let config = CacheConfig::default().with_bucket("views.v1");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_url() {
        let config = CacheConfig::nats("  ");
        assert!(config.validate().is_err());
    }
}
