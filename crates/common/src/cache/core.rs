//! Core cache implementation with LRU eviction and TTL expiry
//!
//! This module provides a generic, thread-safe cache. Bounded caches evict
//! their least recently used entry before inserting into a full map, and
//! expired entries are dropped lazily on access or via [`Cache::purge_expired`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use super::config::CacheConfig;
use super::stats::{CacheStats, MetricsCollector};
use crate::time::{Clock, SystemClock};

/// Entry stored in the cache with metadata for eviction and expiry
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    /// Per-entry TTL override; falls back to the configured default
    ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant, default_ttl: Option<Duration>) -> bool {
        match self.ttl.or(default_ttl) {
            Some(ttl) => now.duration_since(self.inserted_at) >= ttl,
            None => false,
        }
    }
}

/// Internal storage for cache entries
#[derive(Debug)]
struct CacheStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    entries: HashMap<K, CacheEntry<V>>,
    /// Keys ordered least to most recently used
    access_order: Vec<K>,
}

impl<K, V> CacheStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new() -> Self {
        Self { entries: HashMap::new(), access_order: Vec::new() }
    }
}

/// Generic thread-safe cache with LRU eviction and TTL expiry
///
/// # Type Parameters
/// - `K`: Key type (must be `Eq + Hash + Clone`)
/// - `V`: Value type (must be `Clone`)
/// - `C`: Clock type for time-based operations (defaults to `SystemClock`)
///
/// # Example
/// ```
/// use courier_common::cache::{Cache, CacheConfig};
///
/// // Create a simple LRU cache
/// let cache: Cache<String, i32> = Cache::new(CacheConfig::lru(100));
/// cache.insert("key".to_string(), 42);
/// assert_eq!(cache.get(&"key".to_string()), Some(42));
/// ```
pub struct Cache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    storage: Arc<RwLock<CacheStorage<K, V>>>,
    config: CacheConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<K, V> Cache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache with the given configuration using system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    /// Create a new cache with a custom clock (useful for testing)
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            storage: Arc::new(RwLock::new(CacheStorage::new())),
            config,
            metrics: MetricsCollector::new(),
            clock,
        }
    }

    /// Insert a value into the cache
    ///
    /// The entry expires after the configured default TTL, if any. If the
    /// cache is at capacity, the least recently used entry is evicted before
    /// the new entry is inserted.
    pub fn insert(&self, key: K, value: V) {
        self.insert_entry(key, value, None);
    }

    /// Insert a value with a TTL that overrides the configured default
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.insert_entry(key, value, Some(ttl));
    }

    fn insert_entry(&self, key: K, value: V, ttl: Option<Duration>) {
        let mut storage = self.write_storage();

        // Check if eviction is needed
        if let Some(max_entries) = self.config.max_entries {
            if storage.entries.len() >= max_entries && !storage.entries.contains_key(&key) {
                self.evict_lru(&mut storage);
            }
        }

        let entry = CacheEntry { value, inserted_at: self.clock.now(), ttl };
        storage.entries.insert(key.clone(), entry);

        // New and overwritten entries both count as most recently used
        storage.access_order.retain(|k| k != &key);
        storage.access_order.push(key);

        if self.config.track_metrics {
            self.metrics.record_insert();
        }
    }

    /// Get a value from the cache
    ///
    /// Returns `None` if the key doesn't exist or if the entry has expired.
    /// Expired entries are removed on access; hits refresh the LRU position.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut storage = self.write_storage();

        let now = self.clock.now();
        let expired = match storage.entries.get(key) {
            Some(entry) => entry.is_expired(now, self.config.default_ttl),
            None => {
                if self.config.track_metrics {
                    self.metrics.record_miss();
                }
                return None;
            }
        };

        if expired {
            storage.entries.remove(key);
            storage.access_order.retain(|k| k != key);

            if self.config.track_metrics {
                self.metrics.record_miss();
                self.metrics.record_expiration();
            }
            return None;
        }

        let value = storage.entries.get(key).map(|entry| entry.value.clone());
        match value {
            Some(value) => {
                // Refresh LRU position
                storage.access_order.retain(|k| k != key);
                storage.access_order.push(key.clone());

                if self.config.track_metrics {
                    self.metrics.record_hit();
                }
                Some(value)
            }
            None => {
                if self.config.track_metrics {
                    self.metrics.record_miss();
                }
                None
            }
        }
    }

    /// Remove a value from the cache
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut storage = self.write_storage();
        storage.access_order.retain(|k| k != key);
        storage.entries.remove(key).map(|e| e.value)
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        let mut storage = self.write_storage();
        storage.entries.clear();
        storage.access_order.clear();

        if self.config.track_metrics {
            self.metrics.reset();
        }
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.storage.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut storage = self.write_storage();

        // Collect keys to remove (avoid borrow conflict)
        let expired_keys: Vec<K> = storage
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.config.default_ttl))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired_keys {
            storage.entries.remove(key);
            storage.access_order.retain(|k| k != key);

            if self.config.track_metrics {
                self.metrics.record_expiration();
            }
        }

        expired_keys.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let size = self.len();
        self.metrics.snapshot(size, self.config.max_entries)
    }

    /// Evict the least recently used entry
    fn evict_lru(&self, storage: &mut CacheStorage<K, V>) {
        let key_to_evict = storage.access_order.first().cloned();

        if let Some(key) = key_to_evict {
            storage.entries.remove(&key);
            storage.access_order.retain(|k| k != &key);

            if self.config.track_metrics {
                self.metrics.record_eviction();
            }
        }
    }

    /// Write-lock the storage, recovering from poisoning
    ///
    /// The map stays structurally consistent even if a writer panicked, so a
    /// poisoned lock is recovered rather than propagated.
    fn write_storage(&self) -> RwLockWriteGuard<'_, CacheStorage<K, V>> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V, C> Clone for Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
        }
    }
}
