//! Configuration and reporting types for the offline store

use std::time::Duration;

use courier_domain::constants::{
    DEFAULT_OFFLINE_QUOTA_BYTES, DEFAULT_OFFLINE_RETRY_LIMIT, DEFAULT_STORAGE_KEY,
    DEFAULT_SYNC_INTERVAL_SECS,
};
use serde::Serialize;

/// Configuration for the offline store
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// Key the persisted record array lives under
    pub storage_key: String,
    /// Quota for the serialized record array, in bytes
    pub max_bytes: usize,
    /// Delivery failures tolerated per record before it is marked failed
    pub retry_limit: u32,
    /// Flush a newly saved record immediately when online
    pub auto_sync: bool,
    /// Periodic sync cadence while online; `None` disables the timer
    pub sync_interval: Option<Duration>,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_bytes: DEFAULT_OFFLINE_QUOTA_BYTES,
            retry_limit: DEFAULT_OFFLINE_RETRY_LIMIT,
            auto_sync: true,
            sync_interval: Some(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)),
        }
    }
}

impl OfflineConfig {
    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<(), String> {
        if self.storage_key.trim().is_empty() {
            return Err("storage_key must not be blank".to_string());
        }
        if self.max_bytes == 0 {
            return Err("max_bytes must be greater than zero".to_string());
        }
        if let Some(interval) = self.sync_interval {
            if interval.is_zero() {
                return Err("sync_interval must be greater than zero".to_string());
            }
        }
        Ok(())
    }
}

/// Occupancy snapshot of the offline store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Records currently held, in any status
    pub total: usize,
    /// Records awaiting delivery
    pub pending: usize,
    /// Records retained after exhausting their retries
    pub failed: usize,
    /// Byte length of the persisted record array
    pub used_bytes: usize,
    /// Configured quota, in bytes
    pub max_bytes: usize,
    /// Connectivity at the time of the snapshot
    pub is_online: bool,
}

/// Outcome of one sync pass over the pending records
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Pending records the pass tried to deliver
    pub attempted: usize,
    /// Records delivered and removed from the store
    pub delivered: usize,
    /// Records that failed this pass and stay queued for another attempt
    pub retried: usize,
    /// Records downgraded to failed and retained for inspection
    pub failed: usize,
    /// Delivery errors keyed by record id
    pub errors: Vec<(String, String)>,
    /// Wall-clock duration of the pass in milliseconds
    pub elapsed_ms: u64,
}
