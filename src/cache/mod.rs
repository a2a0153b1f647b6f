//! Cache layer
//!
//! Process-local caching for read-heavy catalog data (the exam catalog and
//! the article category list). Services read through the cache and drop the
//! affected key prefix after every write.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumina::cache::{create_cache, CacheLayer};
//! use lumina::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set_default("exams:list:*:*", &exams).await?;
//! cache.delete_prefix("exams:").await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// The generic methods keep this trait from being used as `dyn CacheLayer`;
/// services hold a concrete [`SharedCache`].
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key starting with `prefix`
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// The cache shared by all services
pub type SharedCache = Arc<MemoryCache>;

/// Create the cache described by the configuration
pub fn create_cache(config: &CacheConfig) -> SharedCache {
    let ttl = Duration::from_secs(config.ttl_seconds);
    tracing::debug!(
        "Creating in-memory cache (capacity {}, ttl {:?})",
        config.max_capacity,
        ttl
    );
    Arc::new(MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl))
}
