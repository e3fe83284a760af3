//! # Courier Infrastructure
//!
//! Adapters implementing the `courier-core` ports over real hosts.
//!
//! This crate contains:
//! - A reqwest-backed HTTP transport
//! - In-memory and file-backed key-value stores for the offline backlog
//! - A watch-channel connectivity feed for host platforms
//! - A response cache over `courier-common`
//! - Static and environment-driven request defaults
//!
//! ## Architecture
//! - Implements traits defined in `courier-core`
//! - Contains all host-facing I/O; the service crates stay pure

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod storage;
pub mod transport;

// Re-export commonly used items
pub use cache::MemoryCacheStore;
pub use config::{StaticConfigSource, StaticConfigSourceBuilder};
pub use connectivity::ConnectivityMonitor;
pub use storage::{FileKvStore, MemoryKvStore};
pub use transport::{HttpTransport, HttpTransportBuilder};
