//! Shared building blocks for the Courier crates.
//!
//! This crate hosts the small, dependency-light utilities the rest of the
//! workspace composes:
//!
//! - [`backoff`]: delay policies for retry scheduling
//! - [`cache`]: a thread-safe cache with LRU eviction and TTL expiry
//! - [`time`]: a clock abstraction for deterministic time-based testing

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod backoff;
pub mod cache;
pub mod time;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use backoff::{BackoffPolicy, BackoffStrategy};
pub use cache::{Cache, CacheConfig, CacheConfigBuilder, CacheStats};
pub use time::{Clock, MockClock, SystemClock};
