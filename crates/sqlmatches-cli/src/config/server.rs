//! HTTP listener configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::time::Duration;

use anyhow::{Result as AnyhowResult, bail};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Accepted range for the request and shutdown timeouts, in seconds.
const TIMEOUT_RANGE_SECS: RangeInclusive<u64> = 1..=300;

/// Accepted range for the demo upload timeout, in seconds.
const UPLOAD_TIMEOUT_RANGE_SECS: RangeInclusive<u64> = 60..=86_400;

/// Where the server listens and how long it waits.
///
/// A demo upload streams through a single request and gets its own, longer
/// deadline. Shutdown waits for background workers for at most
/// `shutdown_timeout` seconds.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Address to bind; 0.0.0.0 listens on every interface
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to listen on (1024-65535)
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Seconds an ordinary request may take
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 300)]
    pub request_timeout: u64,

    /// Seconds a demo upload may take (60-86400)
    #[arg(long, env = "UPLOAD_TIMEOUT", default_value_t = 3600)]
    pub upload_timeout: u64,

    /// Seconds to drain requests and stop workers on shutdown
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 30)]
    pub shutdown_timeout: u64,
}

impl ServerConfig {
    /// Rejects privileged ports and timeouts outside their ranges.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.port < 1024 {
            bail!(
                "port {} is privileged, pick one between 1024 and 65535",
                self.port
            );
        }

        check_timeout("request timeout", self.request_timeout, &TIMEOUT_RANGE_SECS)?;
        check_timeout("shutdown timeout", self.shutdown_timeout, &TIMEOUT_RANGE_SECS)?;
        check_timeout("upload timeout", self.upload_timeout, &UPLOAD_TIMEOUT_RANGE_SECS)?;
        Ok(())
    }

    #[must_use]
    pub const fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    #[must_use]
    pub const fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout)
    }

    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    #[must_use]
    pub const fn binds_to_all_interfaces(&self) -> bool {
        self.host.is_unspecified()
    }

    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            addr = %self.server_addr(),
            request_timeout_secs = self.request_timeout,
            upload_timeout_secs = self.upload_timeout,
            shutdown_timeout_secs = self.shutdown_timeout,
            "Server configuration"
        );
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            request_timeout: *TIMEOUT_RANGE_SECS.end(),
            upload_timeout: 3600,
            shutdown_timeout: 30,
        }
    }
}

fn check_timeout(name: &str, secs: u64, range: &RangeInclusive<u64>) -> AnyhowResult<()> {
    if !range.contains(&secs) {
        bail!(
            "{name} of {secs}s is outside {}-{} seconds",
            range.start(),
            range.end()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_local() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.binds_to_all_interfaces());
        assert_eq!(config.server_addr().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn privileged_port_is_rejected() {
        let config = ServerConfig {
            port: 80,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn timeouts_must_stay_in_range() {
        for (request, shutdown) in [(0, 30), (301, 30), (60, 0)] {
            let config = ServerConfig {
                request_timeout: request,
                shutdown_timeout: shutdown,
                ..ServerConfig::default()
            };
            assert!(config.validate().is_err(), "{request}/{shutdown}");
        }
    }

    #[test]
    fn upload_timeout_has_its_own_range() {
        let config = ServerConfig {
            upload_timeout: 7200,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.upload_timeout() > config.request_timeout());

        let config = ServerConfig {
            upload_timeout: 30,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unspecified_host_binds_everywhere() {
        let config = ServerConfig {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ..ServerConfig::default()
        };
        assert!(config.binds_to_all_interfaces());
    }
}
