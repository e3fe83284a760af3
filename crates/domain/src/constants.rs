//! Domain constants
//!
//! Centralized location for the default tuning values used throughout the
//! workspace.

// Request queue defaults
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_RETRY_LIMIT: u32 = 3;
pub const DEFAULT_BASE_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;
pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 30_000;

// Offline store defaults
pub const DEFAULT_OFFLINE_QUOTA_BYTES: usize = 1_048_576;
pub const DEFAULT_OFFLINE_RETRY_LIMIT: u32 = 3;
pub const DEFAULT_STORAGE_KEY: &str = "courier.offline.requests";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

// Response cache defaults
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
