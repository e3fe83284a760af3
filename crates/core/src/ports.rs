//! Port interfaces for transport, connectivity, persistence, and caching
//!
//! All infrastructure access from the services in this crate goes through
//! these traits. Adapters live in `courier-infra`; tests provide mocks.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use courier_domain::{
    NetworkStatus, RequestConfig, RequestMethod, Response, ResponseSource, Result,
};
use serde_json::Value;
use tokio::sync::watch;

/// Fully resolved request descriptor handed to a transport
///
/// Carries only what a transport needs: scheduling and caching fields from
/// [`RequestConfig`] are deliberately absent.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Absolute target address
    pub url: String,
    /// HTTP-style method
    pub method: RequestMethod,
    /// Merged header map
    pub headers: HashMap<String, String>,
    /// Optional JSON body
    pub body: Option<Value>,
    /// Per-attempt timeout, if any
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Build a descriptor from a prepared request configuration
    pub fn from_config(config: &RequestConfig) -> Self {
        Self {
            url: config.url.clone(),
            method: config.method,
            headers: config.headers.clone(),
            body: config.body.clone(),
            timeout: config.timeout,
        }
    }
}

/// Raw response produced by a single transport attempt
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP-style status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Parsed response body
    pub body: Value,
}

impl TransportResponse {
    /// Convert into a domain response for the given request
    pub fn into_response(self, request_id: &str, elapsed: Duration) -> Response {
        Response {
            request_id: request_id.to_string(),
            status: self.status,
            headers: self.headers,
            body: self.body,
            source: ResponseSource::Network,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Trait for performing one network attempt of a prepared request
///
/// Implementations make exactly one attempt; retry scheduling belongs to the
/// queue. Cancellation is expressed by aborting the task polling the future.
/// The default host transport lives in `courier-infra`; any other
/// implementation acts as a custom adapter and should surface its own
/// failures as `Adapter` errors where detectable.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request and return the raw transport response
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Trait for observing host connectivity
///
/// Implementations are fed by the host platform. Subscribers receive every
/// status change, including the offline-to-online transitions the offline
/// store reacts to.
pub trait Connectivity: Send + Sync {
    /// Current connectivity snapshot
    fn status(&self) -> NetworkStatus;

    /// Subscribe to connectivity changes
    fn subscribe(&self) -> watch::Receiver<NetworkStatus>;

    /// Whether the host currently reports an online link
    fn is_online(&self) -> bool {
        self.status().is_online
    }
}

/// Trait for durable key-value persistence used by the offline store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw bytes stored under a key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write the raw bytes stored under a key
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove a key and its value
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Trait for response caching keyed by deterministic request digests
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a cached response
    async fn get(&self, key: &str) -> Result<Option<Response>>;

    /// Store a response under the key with an optional TTL override
    async fn set(&self, key: &str, response: Response, ttl: Option<Duration>) -> Result<()>;

    /// Drop a single cached response
    async fn remove(&self, key: &str) -> Result<()>;

    /// Drop every cached response
    async fn clear(&self) -> Result<()>;
}

/// Trait for supplying service-level request defaults
pub trait ConfigSource: Send + Sync {
    /// Base address that relative request targets resolve against
    fn base_url(&self) -> Option<String>;

    /// Headers merged under per-request headers
    fn default_headers(&self) -> HashMap<String, String>;

    /// Timeout applied when a request carries none
    fn default_timeout(&self) -> Option<Duration>;
}
