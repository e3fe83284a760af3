//! Common data types used throughout the workspace

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// HTTP-style request method carried by a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl RequestMethod {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RequestMethod {
    fn default() -> Self {
        Self::Get
    }
}

/// Caller-supplied description of one network call.
///
/// A config is immutable once submitted: retry bookkeeping is owned by the
/// queue, never written back onto this struct, so the caller's copy and the
/// scheduler never alias each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Target address; may be relative until defaults are merged in.
    pub url: String,
    /// Request method, `GET` by default.
    #[serde(default)]
    pub method: RequestMethod,
    /// Headers sent with the request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional JSON body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Per-request timeout; falls back to the service default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Higher values dispatch first; ties break by arrival order.
    #[serde(default)]
    pub priority: i32,
    /// Whether the response cache may serve and store this request.
    #[serde(default)]
    pub use_cache: bool,
    /// Bypass a cached value even when `use_cache` is set.
    #[serde(default)]
    pub force_refresh: bool,
    /// Dispatch directly instead of through the shared queue.
    #[serde(default)]
    pub skip_queue: bool,
    /// Whether transport failures may be retried (on by default).
    #[serde(default = "default_retry")]
    pub retry: bool,
    /// Per-request retry limit; falls back to the queue default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_limit: Option<u32>,
    /// Per-request cache TTL; falls back to the service default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<Duration>,
    /// Caller-assigned id; generated on submission when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

fn default_retry() -> bool {
    true
}

impl RequestConfig {
    /// Create a config for the given address with defaults everywhere else.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Get,
            headers: HashMap::new(),
            body: None,
            timeout: None,
            priority: 0,
            use_cache: false,
            force_refresh: false,
            skip_queue: false,
            retry: true,
            retry_limit: None,
            cache_ttl: None,
            id: None,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    /// Shorthand for a POST request carrying a JSON body.
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(url).with_method(RequestMethod::Post).with_body(body)
    }

    /// Set the request method.
    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    /// Add a single header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the dispatch priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Enable or disable cache participation.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Set the per-request cache TTL (implies `use_cache`).
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.use_cache = true;
        self.cache_ttl = Some(ttl);
        self
    }

    /// Bypass any cached value for this call.
    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    /// Dispatch directly instead of through the shared queue.
    pub fn skip_queue(mut self) -> Self {
        self.skip_queue = true;
        self
    }

    /// Opt this request out of retries.
    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    /// Override the retry limit for this request.
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    /// Pin the request id instead of generating one on submission.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Whether a target address is present.
    pub fn has_target(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Where a delivered response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Freshly delivered by the transport.
    Network,
    /// Served from the response cache.
    Cache,
}

/// A delivered response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Id of the request this response answers.
    pub request_id: String,
    /// Status code reported by the transport.
    pub status: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Response payload.
    pub body: serde_json::Value,
    /// Network or cache.
    pub source: ResponseSource,
    /// Wall-clock time from dispatch to completion.
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl Response {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Terminal result of an orchestrated send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// The request completed with a response (network or cache).
    Completed(Response),
    /// The process was offline; the request was accepted into the offline
    /// store and will be replayed on reconnect.
    StoredOffline {
        /// Id of the persisted record.
        record_id: String,
    },
}

impl RequestOutcome {
    /// The response, when one was delivered.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Completed(response) => Some(response),
            Self::StoredOffline { .. } => None,
        }
    }

    /// Whether the request was parked in the offline store.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::StoredOffline { .. })
    }
}

/// Physical link type reported by the connectivity source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Ethernet,
    Unknown,
    None,
}

/// Process-wide connectivity snapshot.
///
/// Updated only by connectivity-change notifications, read by the offline
/// store and the network service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub is_online: bool,
    pub connection: ConnectionType,
}

impl NetworkStatus {
    /// Online over the given link.
    pub fn online(connection: ConnectionType) -> Self {
        Self { is_online: true, connection }
    }

    /// Offline, no link.
    pub fn offline() -> Self {
        Self { is_online: false, connection: ConnectionType::None }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::offline()
    }
}

/// Lifecycle state of a persisted offline record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Awaiting delivery.
    Pending,
    /// Retry limit exceeded; retained for inspection until removed.
    Failed,
}

/// Durable unit of the offline store.
///
/// Serialized size contributes to the store's byte accounting. Created on
/// save, mutated (`retry_count`, `status`) by sync attempts, deleted on
/// successful delivery or explicit clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRequest {
    pub id: String,
    pub url: String,
    pub method: RequestMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
    pub retry_count: u32,
    pub status: RecordStatus,
}

impl PersistedRequest {
    /// Build a pending record from a request config, generating an id when
    /// the caller did not pin one.
    pub fn from_config(config: &RequestConfig) -> Self {
        Self {
            id: config.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
            url: config.url.clone(),
            method: config.method,
            data: config.body.clone(),
            headers: config.headers.clone(),
            created_at: epoch_millis(),
            retry_count: 0,
            status: RecordStatus::Pending,
        }
    }

    /// Whether the record still awaits delivery.
    pub fn is_pending(&self) -> bool {
        self.status == RecordStatus::Pending
    }

    /// Serialized size of this record in bytes.
    pub fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map_or(0, |bytes| bytes.len())
    }
}

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
