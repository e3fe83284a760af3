//! Offline request persistence and sync reconciliation
//!
//! Requests accepted while disconnected are stored through the key-value
//! port under a single array-valued record, bounded by a byte quota, and
//! replayed oldest-first when connectivity returns.

mod store;
mod types;

pub use store::OfflineStore;
pub use types::{OfflineConfig, StoreStats, SyncReport};
