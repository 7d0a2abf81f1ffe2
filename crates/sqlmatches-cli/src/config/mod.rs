//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig     # Host, port, timeouts
//! ├── service: ServiceConfig   # Secrets, upload thresholds, task intervals
//! ├── cache: CacheConfig       # NATS key-value cache
//! └── storage: StorageArgs     # Demo storage backend selection
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! sqlmatches --root-secret ... --webhook-key ... --storage-backend local
//!
//! # Or via environment variables
//! ROOT_SECRET=... WEBHOOK_KEY=... STORAGE_BACKEND=b2 sqlmatches
//! ```

mod server;
mod storage;

use std::process;

use anyhow::Context;
use clap::Parser;
use sqlmatches_cache::CacheConfig;
use sqlmatches_server::service::ServiceConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use self::server::ServerConfig;
pub use self::storage::{StorageArgs, StorageKind};
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
///
/// Combines all configuration groups for the SQLMatches server:
/// - [`ServerConfig`]: Network binding and timeouts
/// - [`ServiceConfig`]: Secrets, upload allowance, sweep and retention
/// - [`CacheConfig`]: View cache connection
/// - [`StorageArgs`]: Demo storage backend
#[derive(Debug, Clone, Parser)]
#[command(name = "sqlmatches")]
#[command(about = "SQLMatches match and demo recording server")]
#[command(version)]
pub struct Cli {
    /// HTTP server configuration (host, port, timeouts).
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Match lifecycle and upload configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// View cache configuration.
    #[clap(flatten)]
    pub cache: CacheConfig,

    /// Demo storage configuration.
    #[clap(flatten)]
    pub storage: StorageArgs,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is read before clap parses arguments so its values act
    /// as environment defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.service
            .validate()
            .context("invalid service configuration")?;
        self.cache
            .validate()
            .context("invalid cache configuration")?;
        self.storage
            .validate()
            .context("invalid storage configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            free_upload_size_mb = self.service.free_upload_size_mb,
            max_upload_size_mb = self.service.max_upload_size_mb,
            match_timeout_secs = self.service.match_timeout_secs,
            demo_expires_secs = self.service.demo_expires_secs,
            sweep_interval_secs = self.service.sweep_interval_secs,
            "Service configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            nats_configured = self.cache.nats_url.is_some(),
            bucket = %self.cache.cache_bucket,
            ttl_secs = self.cache.cache_ttl_secs,
            clear_on_startup = self.cache.cache_clear_on_startup,
            "Cache configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            backend = %self.storage.storage_backend,
            extension = %self.storage.demo_extension,
            "Storage configuration"
        );
    }

    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [
            cfg!(feature = "s3").then_some("s3"),
            cfg!(feature = "dotenv").then_some("dotenv"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_minimal_arguments() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "sqlmatches",
            "--root-secret",
            "root",
            "--webhook-key",
            "hook",
            "--storage-backend",
            "none",
        ])?;

        assert_eq!(cli.server.port, 3000);
        assert_eq!(cli.storage.storage_backend, StorageKind::None);
        assert!(cli.cache.cache_clear_on_startup);
        cli.validate()?;
        Ok(())
    }

    #[test]
    fn rejects_unknown_backend() {
        let result = Cli::try_parse_from([
            "sqlmatches",
            "--root-secret",
            "root",
            "--webhook-key",
            "hook",
            "--storage-backend",
            "ftp",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_b2_without_credentials() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "sqlmatches",
            "--root-secret",
            "root",
            "--webhook-key",
            "hook",
            "--storage-backend",
            "b2",
        ])?;
        assert!(cli.validate().is_err());
        Ok(())
    }
}
