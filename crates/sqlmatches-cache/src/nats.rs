//! NATS JetStream key-value cache.

use std::time::Duration;

use async_nats::jetstream::{self, kv};
use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::time::timeout;

use crate::backend::CacheBackend;
use crate::config::CacheConfig;
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_KV};

/// Timeout for flushing pending writes on close.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Cache backed by a JetStream key-value bucket.
///
/// Entry lifetime is the bucket's `max_age`, applied to every key.
#[derive(Debug, Clone)]
pub struct NatsCache {
    client: Client,
    store: kv::Store,
    bucket: String,
}

impl NatsCache {
    /// Connects to NATS and opens (or creates) the configured bucket.
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CLIENT)]
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let url = config
            .nats_url
            .as_deref()
            .ok_or_else(|| Error::invalid_config("NATS URL is not set"))?;

        tracing::info!(target: TRACING_TARGET_CLIENT, url, "Connecting to NATS");

        let mut connect_opts = ConnectOptions::new()
            .name(config.client_name())
            .ping_interval(config.ping_interval())
            .connection_timeout(config.connect_timeout());

        if let Some(token) = &config.nats_token {
            connect_opts = connect_opts.token(token.clone());
        }

        let connect_timeout = config.connect_timeout();
        let client = timeout(
            connect_timeout,
            async_nats::connect_with_options(url, connect_opts),
        )
        .await
        .map_err(|_| Error::timeout("connect", connect_timeout))?
        .map_err(Error::unreachable)?;

        let jetstream = jetstream::new(client.clone());
        let store = open_bucket(&jetstream, &config.cache_bucket, config.ttl()).await?;

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            server_host = %server_info.host,
            server_version = %server_info.version,
            bucket = %config.cache_bucket,
            "Connected to NATS"
        );

        Ok(Self {
            client,
            store,
            bucket: config.cache_bucket.clone(),
        })
    }

    /// Returns the bucket name.
    #[inline]
    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut key_stream = self
            .store
            .keys()
            .await
            .map_err(|e| Error::kv("kv_keys", e))?;

        while let Some(key_result) = key_stream.next().await {
            match key_result {
                Ok(key) => keys.push(key),
                Err(e) => {
                    tracing::warn!(
                        target: TRACING_TARGET_KV,
                        error = %e,
                        "Error reading key from bucket"
                    );
                }
            }
        }

        Ok(keys)
    }
}

async fn open_bucket(
    jetstream: &jetstream::Context,
    bucket: &str,
    ttl: Duration,
) -> Result<kv::Store> {
    match jetstream.get_key_value(bucket).await {
        Ok(store) => {
            tracing::debug!(target: TRACING_TARGET_KV, bucket, "Using existing KV bucket");
            Ok(store)
        }
        Err(_) => {
            tracing::debug!(
                target: TRACING_TARGET_KV,
                bucket,
                ttl_secs = ttl.as_secs(),
                "Creating new KV bucket"
            );

            let config = kv::Config {
                bucket: bucket.to_owned(),
                description: "Cached community and match views".to_owned(),
                max_age: ttl,
                ..Default::default()
            };

            jetstream
                .create_key_value(config)
                .await
                .map_err(|e| Error::kv("kv_create", e))
        }
    }
}

#[async_trait]
impl CacheBackend for NatsCache {
    fn name(&self) -> &'static str {
        "nats"
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.store
            .get(key)
            .await
            .map_err(|e| Error::kv("kv_get", e))
    }

    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    async fn set(&self, key: &str, value: Bytes) -> Result<()> {
        let size = value.len();
        let revision = self
            .store
            .put(key, value)
            .await
            .map_err(|e| Error::kv("kv_put", e))?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key,
            revision,
            size_bytes = size,
            "Put value to KV store"
        );
        Ok(())
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn delete(&self, key: &str) -> Result<()> {
        self.store
            .purge(key)
            .await
            .map_err(|e| Error::kv("kv_delete", e))
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn clear(&self) -> Result<()> {
        let keys = self.keys().await?;
        let count = keys.len();

        for key in keys {
            self.delete(&key).await?;
        }

        tracing::debug!(
            target: TRACING_TARGET_KV,
            count,
            bucket = %self.bucket,
            "Purged all keys from bucket"
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        timeout(FLUSH_TIMEOUT, self.client.flush())
            .await
            .map_err(|_| Error::timeout("flush", FLUSH_TIMEOUT))?
            .map_err(Error::unreachable)?;

        tracing::debug!(target: TRACING_TARGET_CLIENT, "NATS connection flushed");
        Ok(())
    }
}
