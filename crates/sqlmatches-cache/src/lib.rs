#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS connection handling and backend negotiation.
pub const TRACING_TARGET_CLIENT: &str = "sqlmatches_cache::client";

/// Tracing target for NATS key-value operations.
pub const TRACING_TARGET_KV: &str = "sqlmatches_cache::kv";

/// Tracing target for the in-process cache.
pub const TRACING_TARGET_MEMORY: &str = "sqlmatches_cache::memory";

mod backend;
mod cache;
mod config;
mod error;
mod memory;
mod nats;
mod negotiate;

#[doc(hidden)]
pub mod prelude;

pub use backend::CacheBackend;
pub use cache::Cache;
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use memory::MemoryCache;
pub use nats::NatsCache;
pub use negotiate::negotiate;
