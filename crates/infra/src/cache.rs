//! Response cache adapter
//!
//! Wraps the shared LRU/TTL cache from `courier-common` behind the
//! [`CacheStore`] port. Entries expire on their own TTL; the service layer
//! decides what gets cached and for how long.

use std::time::Duration;

use async_trait::async_trait;
use courier_common::{Cache, CacheConfig, CacheStats};
use courier_core::CacheStore;
use courier_domain::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECS};
use courier_domain::{Response, Result};

/// In-memory [`CacheStore`] with LRU eviction and TTL expiry.
pub struct MemoryCacheStore {
    cache: Cache<String, Response>,
}

impl MemoryCacheStore {
    /// Create a cache store with explicit limits.
    pub fn new(config: CacheConfig) -> Self {
        Self { cache: Cache::new(config) }
    }

    /// Cache store with the workspace defaults: bounded, entries expire
    /// after the default TTL.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::ttl_lru(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            DEFAULT_CACHE_CAPACITY,
        ))
    }

    /// Hit/miss/eviction counters for diagnostics.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Response>> {
        Ok(self.cache.get(&key.to_string()))
    }

    async fn set(&self, key: &str, response: Response, ttl: Option<Duration>) -> Result<()> {
        match ttl {
            Some(ttl) => self.cache.insert_with_ttl(key.to_string(), response, ttl),
            None => self.cache.insert(key.to_string(), response),
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.cache.remove(&key.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.clear();
        Ok(())
    }
}
