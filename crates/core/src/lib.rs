//! # Courier Core
//!
//! Request orchestration logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The priority request queue with bounded concurrency and retry
//! - The quota-bound offline store with sync reconciliation
//! - The network service facade composing cache, interceptors, offline
//!   fallback, and queueing into one request pipeline
//! - Port interfaces (traits) for transport, connectivity, persistence,
//!   and caching
//!
//! ## Architecture Principles
//! - Only depends on `courier-common` and `courier-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits
//! - Pure, testable orchestration logic

pub mod client;
pub mod offline;
pub mod ports;
pub mod queue;

// Re-export specific items to avoid ambiguity
pub use client::{
    ActiveRequestInfo, BatchOptions, InFlightRequest, InterceptorChain, NetworkService,
    ServiceConfig,
};
pub use offline::{OfflineConfig, OfflineStore, StoreStats, SyncReport};
pub use ports::{
    CacheStore, ConfigSource, Connectivity, KeyValueStore, Transport, TransportRequest,
    TransportResponse,
};
pub use queue::{QueueConfig, QueueStats, QueueStatus, RequestQueue, SubmittedRequest};
