//! Cache layer
//!
//! In-process cache (moka) for hot public reads: post listings, single
//! posts, brand pages and the team directory. Writers invalidate by key
//! pattern, so readers never see data older than one write.
//!
//! ```rust,ignore
//! use kinyweb::cache::{create_cache, CacheLayer};
//!
//! let cache = create_cache(&config.cache);
//! cache.set("posts:slug:hello", &post, cache.default_ttl()).await?;
//! cache.delete_pattern("posts:*").await?;
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
/// Generic over the cached value, so it is used through the concrete
/// [`Cache`] type rather than as a trait object.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values whose key matches a glob pattern (`*`, `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

/// The cache used by services
pub type Cache = MemoryCache;

/// Create the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}

/// Read through the cache: return the cached value or load, store and
/// return it. Cache failures are logged and fall back to the loader.
pub async fn cached<T, E, F, Fut>(cache: &Cache, key: &str, load: F) -> std::result::Result<T, E>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
{
    match cache.get::<T>(key).await {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {:#}", key, e),
    }

    let value = load().await?;
    if let Err(e) = cache.set(key, &value, cache.default_ttl()).await {
        tracing::warn!("Cache write failed for {}: {:#}", key, e);
    }
    Ok(value)
}

/// Drop every key matching `pattern`, logging instead of failing
pub async fn invalidate(cache: &Cache, pattern: &str) {
    if let Err(e) = cache.delete_pattern(pattern).await {
        tracing::warn!("Cache invalidation failed for {}: {:#}", pattern, e);
    }
}
