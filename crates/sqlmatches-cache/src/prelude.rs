//! Prelude module for convenient imports.

pub use crate::backend::CacheBackend;
pub use crate::cache::Cache;
pub use crate::config::CacheConfig;
pub use crate::error::{Error, Result};
