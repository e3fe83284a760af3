//! Integration tests for cache module
//!
//! Tests LRU eviction, TTL overrides, and concurrent access patterns

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use courier_common::cache::{Cache, CacheConfig};
use courier_common::time::MockClock;

/// Verifies basic cache operations (insert, get) with LRU eviction.
///
/// This test ensures that when a cache reaches its maximum capacity, the least
/// recently used item is evicted when a new item is inserted. It validates that
/// accessing an item updates its "recently used" status and prevents eviction.
///
/// # Test Steps
/// 1. Insert 3 items into a cache with a capacity of 3
/// 2. Access key1 to mark it as recently used
/// 3. Insert a 4th item, triggering eviction of key2 (least recently used)
/// 4. Verify key1 and key3 remain, key2 is evicted, key4 is present
#[test]
fn test_lru_cache_basic_operations() {
    let cache: Cache<String, i32> = Cache::new(CacheConfig::lru(3));

    // Insert items
    cache.insert("key1".to_string(), 100);
    cache.insert("key2".to_string(), 200);
    cache.insert("key3".to_string(), 300);

    // Verify all items exist
    assert_eq!(cache.get(&"key1".to_string()), Some(100));
    assert_eq!(cache.get(&"key2".to_string()), Some(200));
    assert_eq!(cache.get(&"key3".to_string()), Some(300));

    // Access key1 to make it recently used
    let _ = cache.get(&"key1".to_string());

    // Insert new item - should evict key2 (least recently used)
    cache.insert("key4".to_string(), 400);

    assert_eq!(cache.get(&"key1".to_string()), Some(100)); // Still exists
    assert_eq!(cache.get(&"key2".to_string()), None); // Evicted
    assert_eq!(cache.get(&"key3".to_string()), Some(300)); // Still exists
    assert_eq!(cache.get(&"key4".to_string()), Some(400)); // New item
}

/// Validates TTL expiration combined with a capacity bound.
///
/// This test verifies that entries expire after the configured default TTL
/// even while the LRU bound is active, and that a per-entry TTL override
/// takes precedence over the default.
///
/// # Test Steps
/// 1. Create a bounded cache with a 60s default TTL on a mock clock
/// 2. Insert one entry with the default TTL and one with a 300s override
/// 3. Advance the clock past the default TTL
/// 4. Verify the default entry expired while the override entry survives
#[test]
fn test_ttl_with_capacity_bound() {
    let clock = MockClock::new();
    let config = CacheConfig::builder()
        .max_entries(10)
        .default_ttl(Duration::from_secs(60))
        .build();
    let cache: Cache<String, i32, _> = Cache::with_clock(config, clock.clone());

    cache.insert("short".to_string(), 1);
    cache.insert_with_ttl("long".to_string(), 2, Duration::from_secs(300));

    clock.advance(Duration::from_secs(61));

    assert_eq!(cache.get(&"short".to_string()), None);
    assert_eq!(cache.get(&"long".to_string()), Some(2));
}

/// Exercises the cache from multiple threads simultaneously.
///
/// This test ensures that concurrent inserts and reads through cloned handles
/// neither panic nor lose entries, and that the entry count stays within the
/// configured capacity.
///
/// # Test Steps
/// 1. Share one bounded cache across 8 threads
/// 2. Each thread inserts and reads back 50 keys
/// 3. Join all threads and verify the size respects the capacity
#[test]
fn test_concurrent_access() {
    let cache: Arc<Cache<String, usize>> = Arc::new(Cache::new(CacheConfig::lru(100)));

    let mut handles = vec![];
    for t in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let key = format!("key-{}-{}", t, i);
                cache.insert(key.clone(), i);
                let _ = cache.get(&key);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.len() <= 100);
}

/// Confirms that metrics survive access through cloned handles.
///
/// # Test Steps
/// 1. Create a metrics-tracking cache and clone the handle
/// 2. Insert through one handle, read through the other
/// 3. Verify the stats snapshot reflects both operations
#[test]
fn test_metrics_shared_across_clones() {
    let config = CacheConfig::builder().max_entries(10).track_metrics(true).build();
    let cache: Cache<String, i32> = Cache::new(config);
    let reader = cache.clone();

    cache.insert("key".to_string(), 1);
    let _ = reader.get(&"key".to_string());
    let _ = reader.get(&"missing".to_string());

    let stats = cache.stats();
    assert_eq!(stats.inserts, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}
