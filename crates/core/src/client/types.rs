//! Configuration and tracking types for the network service

use std::time::Duration;

use courier_domain::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_CONCURRENCY, DEFAULT_DISPATCH_TIMEOUT_MS,
};
use courier_domain::{NetError, RequestMethod, RequestOutcome, Result};
use serde::Serialize;
use tokio::sync::oneshot;

/// Tuning for the network service facade
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Timeout applied when neither the request nor the config source
    /// carries one
    pub default_timeout: Duration,
    /// Lifetime of cached responses without a per-request override
    pub cache_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(DEFAULT_DISPATCH_TIMEOUT_MS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl ServiceConfig {
    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.default_timeout.is_zero() {
            return Err("default_timeout must be greater than zero".to_string());
        }
        if self.cache_ttl.is_zero() {
            return Err("cache_ttl must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Options shaping a `batch` call
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Fan out concurrently instead of awaiting each request in order
    pub parallel: bool,
    /// Concurrency cap for parallel mode
    pub max_concurrent: usize,
    /// Bypass the queue for every request in the batch
    pub skip_queue: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { parallel: true, max_concurrent: DEFAULT_CONCURRENCY, skip_queue: false }
    }
}

/// Snapshot of one request currently moving through the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRequestInfo {
    pub id: String,
    pub url: String,
    pub method: RequestMethod,
    /// Time since the request entered the pipeline
    pub elapsed: Duration,
}

/// Handle to a request travelling through the service pipeline
///
/// Dropping the handle does not cancel the request.
#[derive(Debug)]
pub struct InFlightRequest {
    id: String,
    rx: oneshot::Receiver<Result<RequestOutcome>>,
}

impl InFlightRequest {
    pub(crate) fn new(id: String, rx: oneshot::Receiver<Result<RequestOutcome>>) -> Self {
        Self { id, rx }
    }

    /// Identifier under which the request is tracked and cancelable
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the terminal outcome
    ///
    /// A pipeline torn down by cancellation resolves as `Canceled`.
    pub async fn outcome(self) -> Result<RequestOutcome> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(NetError::Canceled),
        }
    }
}
