//! Priority request queue with bounded concurrency and retry
//!
//! Submissions enter a wait-list ordered by priority and arrival, dispatch
//! through the configured transport under a concurrency cap, and surface
//! their terminal outcome on a one-shot completion ticket.

mod metrics;
mod service;
mod types;

pub use service::RequestQueue;
pub use types::{QueueConfig, QueueStats, QueueStatus, SubmittedRequest};
