//! Startup selection between the distributed and in-process caches.

use std::sync::Arc;

use crate::backend::CacheBackend;
use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::memory::MemoryCache;
use crate::nats::NatsCache;
use crate::{Result, TRACING_TARGET_CLIENT};

/// Key probed to confirm the distributed cache answers requests.
const PROBE_KEY: &str = "connection";

/// Picks the cache backend for the process lifetime.
///
/// Tries NATS when a URL is configured and confirms it answers an `exists`
/// probe. Any failure, including a missing URL, degrades to the in-process
/// cache with a warning; startup never fails here. When configured, the
/// selected cache is cleared before it is returned.
pub async fn negotiate(config: &CacheConfig) -> Cache {
    let backend: Arc<dyn CacheBackend> = match connect_nats(config).await {
        Ok(Some(nats)) => Arc::new(nats),
        Ok(None) => {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                "Memory cache being used, use NATS for production."
            );
            Arc::new(MemoryCache::with_ttl(config.ttl()))
        }
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                error = %err,
                "Memory cache being used, use NATS for production."
            );
            Arc::new(MemoryCache::with_ttl(config.ttl()))
        }
    };

    let cache = Cache::new(backend);

    if config.cache_clear_on_startup {
        match cache.clear().await {
            Ok(()) => tracing::info!(
                target: TRACING_TARGET_CLIENT,
                backend = cache.backend_name(),
                "Cache cleared on startup"
            ),
            Err(err) => tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                backend = cache.backend_name(),
                error = %err,
                "Failed to clear cache on startup"
            ),
        }
    }

    tracing::info!(
        target: TRACING_TARGET_CLIENT,
        backend = cache.backend_name(),
        "Cache ready"
    );

    cache
}

async fn connect_nats(config: &CacheConfig) -> Result<Option<NatsCache>> {
    if config.nats_url.is_none() {
        return Ok(None);
    }

    let nats = NatsCache::connect(config).await?;
    nats.exists(PROBE_KEY).await?;
    Ok(Some(nats))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn missing_url_uses_memory() -> anyhow::Result<()> {
        let cache = negotiate(&CacheConfig::default()).await;

        assert_eq!(cache.backend_name(), "memory");
        cache.set("k", "v").await?;
        assert_eq!(cache.get("k").await?.as_deref(), Some(&b"v"[..]));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_nats_falls_back_to_memory() -> anyhow::Result<()> {
        let config = CacheConfig::nats("nats://127.0.0.1:1")
            .with_connect_timeout(Duration::from_secs(2));

        let cache = negotiate(&config).await;

        assert_eq!(cache.backend_name(), "memory");
        cache.set("k", "v").await?;
        assert_eq!(cache.get("k").await?.as_deref(), Some(&b"v"[..]));
        assert!(!cache.exists("missing").await?);
        cache.clear().await?;
        assert!(!cache.exists("k").await?);
        Ok(())
    }
}
