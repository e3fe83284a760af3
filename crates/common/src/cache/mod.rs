//! Generic thread-safe cache with LRU eviction and TTL expiry
//!
//! This module provides the cache used for response reuse across the
//! workspace. Entries are evicted least-recently-used first when a bounded
//! cache fills up, and expire lazily once their time-to-live elapses. A
//! per-entry TTL can override the configured default.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock<>>` for safe concurrent access
//! - **Generic**: Works with any `K: Eq + Hash + Clone` and `V: Clone`
//! - **TTL support**: Lazy expiration with per-entry overrides
//! - **Metrics tracking**: Optional hit/miss/eviction statistics
//! - **Testable**: Clock abstraction for deterministic time-based testing
//!
//! # Examples
//!
//! ## Simple LRU Cache
//! ```
//! use courier_common::cache::{Cache, CacheConfig};
//!
//! let cache: Cache<String, i32> = Cache::new(CacheConfig::lru(100));
//! cache.insert("key".to_string(), 42);
//! assert_eq!(cache.get(&"key".to_string()), Some(42));
//! ```
//!
//! ## Combined TTL + LRU
//! ```
//! use std::time::Duration;
//!
//! use courier_common::cache::{Cache, CacheConfig};
//!
//! let cache: Cache<String, Vec<u8>> =
//!     Cache::new(CacheConfig::ttl_lru(Duration::from_secs(300), 1000));
//! ```
//!
//! ## Cache Statistics
//! ```
//! use courier_common::cache::{Cache, CacheConfig};
//!
//! let config = CacheConfig::builder().max_entries(100).track_metrics(true).build();
//!
//! let cache: Cache<String, i32> = Cache::new(config);
//!
//! cache.insert("key1".to_string(), 1);
//! let _ = cache.get(&"key1".to_string());
//!
//! let stats = cache.stats();
//! println!("Hit rate: {:.2}%", stats.hit_rate() * 100.0);
//! ```

mod config;
mod core;
mod stats;

// Re-export public API
pub use core::Cache;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use stats::CacheStats;
