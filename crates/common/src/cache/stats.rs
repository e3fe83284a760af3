//! Cache statistics and metrics tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,

    /// Maximum allowed entries (None = unlimited)
    pub max_entries: Option<usize>,

    /// Total number of successful get operations
    pub hits: u64,

    /// Total number of failed get operations (key not found or expired)
    pub misses: u64,

    /// Total number of insert operations
    pub inserts: u64,

    /// Total number of evicted entries
    pub evictions: u64,

    /// Total number of expired entries removed
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total accesses)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate miss rate (misses / total accesses)
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Total number of access operations (hits + misses)
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Thread-safe metrics collector for cache operations
///
/// Uses atomic operations to track cache metrics without requiring locks,
/// enabling low-overhead monitoring.
#[derive(Debug)]
pub(crate) struct MetricsCollector {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    inserts: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
    expirations: Arc<AtomicU64>,
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            hits: Arc::clone(&self.hits),
            misses: Arc::clone(&self.misses),
            inserts: Arc::clone(&self.inserts),
            evictions: Arc::clone(&self.evictions),
            expirations: Arc::clone(&self.expirations),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub(crate) fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            inserts: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
            expirations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a cache hit
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an insert operation
    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction
    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an expiration
    pub(crate) fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub(crate) fn snapshot(&self, size: usize, max_entries: Option<usize>) -> CacheStats {
        CacheStats {
            size,
            max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub(crate) fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::stats.
    use super::*;

    /// Validates `CacheStats::hit_rate` behavior for the hit rate scenario.
    ///
    /// Assertions:
    /// - Confirms `stats.hit_rate()` equals `0.75`.
    /// - Confirms `stats.miss_rate()` equals `0.25`.
    /// - Confirms `stats.total_accesses()` equals `4`.
    #[test]
    fn test_hit_and_miss_rates() {
        let stats = CacheStats { hits: 3, misses: 1, ..CacheStats::default() };

        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.miss_rate(), 0.25);
        assert_eq!(stats.total_accesses(), 4);
    }

    /// Validates `CacheStats::default` behavior for the empty stats scenario.
    ///
    /// Assertions:
    /// - Confirms `stats.hit_rate()` equals `0.0` when no accesses occurred.
    #[test]
    fn test_hit_rate_with_no_accesses() {
        let stats = CacheStats::default();

        assert_eq!(stats.hit_rate(), 0.0);
    }

    /// Validates `MetricsCollector::snapshot` behavior for the collector
    /// snapshot scenario.
    ///
    /// Assertions:
    /// - Confirms the snapshot reflects each recorded event.
    /// - Confirms `reset` zeroes every counter.
    #[test]
    fn test_collector_snapshot_and_reset() {
        let collector = MetricsCollector::new();
        collector.record_hit();
        collector.record_hit();
        collector.record_miss();
        collector.record_insert();
        collector.record_eviction();
        collector.record_expiration();

        let stats = collector.snapshot(2, Some(10));
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_entries, Some(10));
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expirations, 1);

        collector.reset();
        let stats = collector.snapshot(0, Some(10));
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.total_accesses(), 0);
    }

    /// Validates `serde_json::to_value` behavior for the stats serialization
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the JSON snapshot carries the hit and miss counters.
    #[test]
    fn test_stats_serialize() {
        let stats = CacheStats { size: 1, hits: 5, misses: 2, ..CacheStats::default() };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["hits"], 5);
        assert_eq!(json["misses"], 2);
        assert_eq!(json["size"], 1);
    }
}
