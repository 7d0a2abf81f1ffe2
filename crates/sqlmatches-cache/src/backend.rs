//! The cache backend contract.

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;

/// Key/value contract shared by the distributed and in-process caches.
///
/// Keys are dot-separated strings such as `community.c1.matches`. Values are
/// opaque bytes; expiry is backend-defined.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Short backend name for logs and health reports.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    async fn set(&self, key: &str, value: Bytes) -> Result<()>;

    /// Whether a live entry exists. Also used as the reachability probe.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Removes an entry. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes every entry.
    async fn clear(&self) -> Result<()>;

    /// Flushes and releases the backend.
    async fn close(&self) -> Result<()>;
}
