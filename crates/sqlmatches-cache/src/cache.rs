//! Shared cache handle.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::CacheBackend;
use crate::memory::MemoryCache;
use crate::{Result, TRACING_TARGET_CLIENT};

/// Cheaply cloneable handle over the backend chosen at startup.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    /// Wraps a backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// An in-process cache with no expiry.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.backend.get(key).await
    }

    pub async fn set(&self, key: &str, value: impl Into<Bytes>) -> Result<()> {
        self.backend.set(key, value.into()).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(key).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    pub async fn close(&self) -> Result<()> {
        self.backend.close().await
    }

    /// Reads and deserializes a JSON value.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serializes and stores a JSON value.
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value)?;
        self.backend.set(key, json.into()).await
    }

    /// Deletes several keys. Failures are logged and do not stop the rest;
    /// the first one is returned.
    pub async fn invalidate(&self, keys: &[String]) -> Result<()> {
        let mut first_error = None;

        for key in keys {
            if let Err(err) = self.backend.delete(key).await {
                tracing::warn!(
                    target: TRACING_TARGET_CLIENT,
                    key = %key,
                    error = %err,
                    "Failed to invalidate cache entry"
                );
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct View {
        id: String,
        score: u32,
    }

    #[tokio::test]
    async fn json_round_trip() -> anyhow::Result<()> {
        let cache = Cache::memory();
        let view = View {
            id: "m1".to_owned(),
            score: 16,
        };

        cache.set_json("match.m1", &view).await?;
        assert_eq!(cache.get_json::<View>("match.m1").await?, Some(view));
        assert_eq!(cache.get_json::<View>("match.m2").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn invalidate_removes_listed_keys() -> anyhow::Result<()> {
        let cache = Cache::memory();
        cache.set("a", "1").await?;
        cache.set("b", "2").await?;
        cache.set("c", "3").await?;

        cache
            .invalidate(&["a".to_owned(), "b".to_owned(), "missing".to_owned()])
            .await?;

        assert!(!cache.exists("a").await?);
        assert!(!cache.exists("b").await?);
        assert!(cache.exists("c").await?);
        Ok(())
    }
}
