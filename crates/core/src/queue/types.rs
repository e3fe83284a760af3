//! Public types for the request queue

use std::time::Duration;

use courier_common::backoff::BackoffPolicy;
use courier_domain::constants::{
    DEFAULT_BASE_RETRY_DELAY_MS, DEFAULT_CONCURRENCY, DEFAULT_DISPATCH_TIMEOUT_MS,
    DEFAULT_MAX_RETRY_DELAY_MS, DEFAULT_RETRY_LIMIT,
};
use courier_domain::{NetError, Response, Result};
use serde::Serialize;
use tokio::sync::oneshot;

/// Configuration for the request queue
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of concurrently dispatched requests
    pub concurrency: usize,

    /// Retries granted to a failed dispatch; per-request limits override this
    pub retry_limit: u32,

    /// Delay policy between retry attempts
    pub backoff: BackoffPolicy,

    /// Fallback timeout for dispatch attempts without a per-request timeout
    pub dispatch_timeout: Duration,

    /// Whether the queue starts paused
    pub start_paused: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry_limit: DEFAULT_RETRY_LIMIT,
            backoff: BackoffPolicy::exponential(
                Duration::from_millis(DEFAULT_BASE_RETRY_DELAY_MS),
                Duration::from_millis(DEFAULT_MAX_RETRY_DELAY_MS),
            ),
            dispatch_timeout: Duration::from_millis(DEFAULT_DISPATCH_TIMEOUT_MS),
            start_paused: false,
        }
    }
}

impl QueueConfig {
    /// Check the configuration for invalid settings
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }
        if self.dispatch_timeout.is_zero() {
            return Err("dispatch timeout must be greater than zero".to_string());
        }
        self.backoff.validate()
    }
}

/// Point-in-time view of queue occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Entries waiting in the dispatch order
    pub pending: usize,

    /// Entries currently being dispatched
    pub active: usize,

    /// Whether dispatching is paused
    pub paused: bool,
}

/// Lifetime queue counters
///
/// Counters only ever grow until [`reset`](crate::queue::RequestQueue::reset_stats);
/// they are not decremented when entries leave the queue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    /// Requests accepted by `enqueue`
    pub enqueued: u64,

    /// Dispatch attempts handed to the transport
    pub dispatched: u64,

    /// Requests that reached a successful terminal outcome
    pub succeeded: u64,

    /// Requests that reached a failed terminal outcome
    pub failed: u64,

    /// Retry attempts scheduled after failed dispatches
    pub retried: u64,

    /// Requests canceled, cleared, or dequeued before completion
    pub canceled: u64,

    /// Longest wait-list length observed
    pub max_pending: usize,

    /// Mean duration of the final dispatch attempt, in milliseconds
    pub avg_processing_ms: f64,
}

/// Handle returned by `enqueue`, resolving to the terminal outcome
#[derive(Debug)]
pub struct SubmittedRequest {
    id: String,
    rx: oneshot::Receiver<Result<Response>>,
}

impl SubmittedRequest {
    pub(crate) fn new(id: String, rx: oneshot::Receiver<Result<Response>>) -> Self {
        Self { id, rx }
    }

    /// Id assigned to the queued request
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the terminal outcome of this request
    ///
    /// Resolves exactly once: with the response, the terminal error, or
    /// `Canceled` when the entry was discarded before dispatch completed.
    pub async fn wait(self) -> Result<Response> {
        match self.rx.await {
            Ok(result) => result,
            // Sender dropped without a result: the entry was discarded
            Err(_) => Err(NetError::Canceled),
        }
    }
}
