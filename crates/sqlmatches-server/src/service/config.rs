//! Service configuration: secrets, thresholds and task intervals.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::pipeline::UploadAllowance;
use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    /// Free upload size in megabytes.
    pub const FREE_UPLOAD_SIZE_MB: u64 = 30;
    /// Maximum upload size in megabytes.
    pub const MAX_UPLOAD_SIZE_MB: u64 = 100;
    /// Match timeout: three hours.
    pub const MATCH_TIMEOUT_SECS: u64 = 3 * 60 * 60;
    /// Demo retention: twenty weeks.
    pub const DEMO_EXPIRES_SECS: u64 = 20 * 7 * 24 * 60 * 60;
    /// Timestamp format used in match views.
    pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y-%H:%M:%S";
    /// Interval between sweeps of abandoned matches.
    pub const SWEEP_INTERVAL_SECS: u64 = 60;
    /// Interval between demo retention passes.
    pub const RETENTION_INTERVAL_SECS: u64 = 60 * 60;
}

/// Configuration for [`ServiceState`].
///
/// The secrets are plaintext only until the state is built; construction
/// hashes them and clears these fields.
///
/// [`ServiceState`]: crate::service::ServiceState
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Secret identifying the root operator
    #[cfg_attr(feature = "config", arg(long, env = "ROOT_SECRET", hide_env_values = true))]
    pub root_secret: String,

    /// Secret expected on webhook calls
    #[cfg_attr(feature = "config", arg(long, env = "WEBHOOK_KEY", hide_env_values = true))]
    pub webhook_key: String,

    /// Demos up to this many megabytes are accepted from every community
    #[cfg_attr(
        feature = "config",
        arg(long, env = "FREE_UPLOAD_SIZE", default_value_t = defaults::FREE_UPLOAD_SIZE_MB)
    )]
    pub free_upload_size_mb: u64,

    /// Demos above this many megabytes are always rejected
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_UPLOAD_SIZE", default_value_t = defaults::MAX_UPLOAD_SIZE_MB)
    )]
    pub max_upload_size_mb: u64,

    /// Seconds a match may stay open before it is swept
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MATCH_TIMEOUT", default_value_t = defaults::MATCH_TIMEOUT_SECS)
    )]
    pub match_timeout_secs: u64,

    /// Seconds an uploaded demo is kept
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DEMO_EXPIRES", default_value_t = defaults::DEMO_EXPIRES_SECS)
    )]
    pub demo_expires_secs: u64,

    /// strftime format for match timestamps
    #[cfg_attr(
        feature = "config",
        arg(long, env = "TIMESTAMP_FORMAT", default_value = defaults::TIMESTAMP_FORMAT)
    )]
    pub timestamp_format: String,

    /// Seconds between sweeps of abandoned matches
    #[cfg_attr(
        feature = "config",
        arg(long, env = "SWEEP_INTERVAL", default_value_t = defaults::SWEEP_INTERVAL_SECS)
    )]
    pub sweep_interval_secs: u64,

    /// Seconds between demo retention passes
    #[cfg_attr(
        feature = "config",
        arg(long, env = "RETENTION_INTERVAL", default_value_t = defaults::RETENTION_INTERVAL_SECS)
    )]
    pub retention_interval_secs: u64,
}

impl ServiceConfig {
    /// Creates a configuration with default thresholds.
    pub fn new(root_secret: impl Into<String>, webhook_key: impl Into<String>) -> Self {
        Self {
            root_secret: root_secret.into(),
            webhook_key: webhook_key.into(),
            free_upload_size_mb: defaults::FREE_UPLOAD_SIZE_MB,
            max_upload_size_mb: defaults::MAX_UPLOAD_SIZE_MB,
            match_timeout_secs: defaults::MATCH_TIMEOUT_SECS,
            demo_expires_secs: defaults::DEMO_EXPIRES_SECS,
            timestamp_format: defaults::TIMESTAMP_FORMAT.to_owned(),
            sweep_interval_secs: defaults::SWEEP_INTERVAL_SECS,
            retention_interval_secs: defaults::RETENTION_INTERVAL_SECS,
        }
    }

    /// Set the match timeout.
    pub fn with_match_timeout(mut self, timeout: Duration) -> Self {
        self.match_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the upload thresholds in megabytes.
    pub fn with_upload_sizes(mut self, free_mb: u64, max_mb: u64) -> Self {
        self.free_upload_size_mb = free_mb;
        self.max_upload_size_mb = max_mb;
        self
    }

    pub fn upload_allowance(&self) -> UploadAllowance {
        UploadAllowance::from_megabytes(self.free_upload_size_mb, self.max_upload_size_mb)
    }

    pub fn match_timeout(&self) -> SignedDuration {
        SignedDuration::from_secs(saturating_secs(self.match_timeout_secs))
    }

    pub fn demo_expires(&self) -> SignedDuration {
        SignedDuration::from_secs(saturating_secs(self.demo_expires_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.retention_interval_secs)
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.root_secret.is_empty() {
            return Err(Error::config("root secret must not be empty"));
        }
        if self.webhook_key.is_empty() {
            return Err(Error::config("webhook key must not be empty"));
        }
        if self.free_upload_size_mb > self.max_upload_size_mb {
            return Err(Error::config(
                "free upload size must not exceed the maximum upload size",
            ));
        }
        if self.max_upload_size_mb == 0 {
            return Err(Error::config("maximum upload size must be positive"));
        }
        if self.match_timeout_secs == 0 {
            return Err(Error::config("match timeout must be positive"));
        }
        if self.sweep_interval_secs == 0 || self.retention_interval_secs == 0 {
            return Err(Error::config("task intervals must be positive"));
        }
        if jiff::fmt::strtime::format(&self.timestamp_format, jiff::Timestamp::UNIX_EPOCH)
            .is_err()
        {
            return Err(Error::config(format!(
                "invalid timestamp format '{}'",
                self.timestamp_format
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("root_secret", &"<redacted>")
            .field("webhook_key", &"<redacted>")
            .field("free_upload_size_mb", &self.free_upload_size_mb)
            .field("max_upload_size_mb", &self.max_upload_size_mb)
            .field("match_timeout_secs", &self.match_timeout_secs)
            .field("demo_expires_secs", &self.demo_expires_secs)
            .field("timestamp_format", &self.timestamp_format)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("retention_interval_secs", &self.retention_interval_secs)
            .finish()
    }
}

fn saturating_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_settings() {
        let config = ServiceConfig::new("root", "hook");
        assert!(config.validate().is_ok());
        assert_eq!(config.match_timeout(), SignedDuration::from_hours(3));
        assert_eq!(config.demo_expires(), SignedDuration::from_hours(20 * 7 * 24));
        assert_eq!(config.upload_allowance(), UploadAllowance::from_megabytes(30, 100));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let config = ServiceConfig::new("root", "hook").with_upload_sizes(200, 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_secrets() {
        assert!(ServiceConfig::new("", "hook").validate().is_err());
        assert!(ServiceConfig::new("root", "").validate().is_err());
    }

    #[test]
    fn rejects_bad_timestamp_format() {
        let mut config = ServiceConfig::new("root", "hook");
        config.timestamp_format = "%m/%d/%".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", ServiceConfig::new("hunter2", "letmein"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("letmein"));
    }
}
