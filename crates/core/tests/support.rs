use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{CacheStore, ConfigSource, Connectivity, KeyValueStore};
use courier_core::{Transport, TransportRequest, TransportResponse};
use courier_domain::{ConnectionType, NetworkStatus, Response, Result};
use serde_json::Value;
use tokio::sync::watch;

static TRACING: Once = Once::new();

/// Install a fmt subscriber honoring `RUST_LOG` (idempotent)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Transport double that replays scripted results in call order
///
/// Calls beyond the script succeed with a plain 200. The script entry is
/// consumed when the call starts, so concurrent calls map to entries in
/// start order.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Always succeed with a plain 200
    pub fn ok() -> Arc<Self> {
        Self::build(Vec::new(), None)
    }

    /// Succeed with a plain 200 after sleeping `delay` per call
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Self::build(Vec::new(), Some(delay))
    }

    /// Replay the given results in order, then fall back to plain 200s
    pub fn script(results: Vec<Result<TransportResponse>>) -> Arc<Self> {
        Self::build(results, None)
    }

    /// Replay scripted results with a per-call delay
    pub fn script_with_delay(
        results: Vec<Result<TransportResponse>>,
        delay: Duration,
    ) -> Arc<Self> {
        Self::build(results, Some(delay))
    }

    fn build(results: Vec<Result<TransportResponse>>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(results.into()),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Total calls started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Target addresses in call-start order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("sent log lock").clone()
    }

    /// A plain successful response
    pub fn ok_response() -> TransportResponse {
        TransportResponse { status: 200, headers: HashMap::new(), body: Value::Null }
    }

    /// A successful response with the given status and body
    pub fn response(status: u16, body: Value) -> TransportResponse {
        TransportResponse { status, headers: HashMap::new(), body }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        self.sent.lock().expect("sent log lock").push(request.url);
        let scripted = self.responses.lock().expect("script lock").pop_front();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match scripted {
            Some(result) => result,
            None => Ok(Self::ok_response()),
        }
    }
}

/// Connectivity double driven by tests through a watch channel
pub struct TestConnectivity {
    tx: watch::Sender<NetworkStatus>,
}

impl TestConnectivity {
    pub fn online() -> Arc<Self> {
        Self::with_status(NetworkStatus::online(ConnectionType::Wifi))
    }

    pub fn offline() -> Arc<Self> {
        Self::with_status(NetworkStatus::offline())
    }

    fn with_status(status: NetworkStatus) -> Arc<Self> {
        let (tx, _) = watch::channel(status);
        Arc::new(Self { tx })
    }

    /// Flip the reported connectivity, notifying subscribers
    pub fn set_online(&self, online: bool) {
        let status = if online {
            NetworkStatus::online(ConnectionType::Wifi)
        } else {
            NetworkStatus::offline()
        };
        self.tx.send_replace(status);
    }
}

impl Connectivity for TestConnectivity {
    fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }
}

/// In-memory key-value store backing offline-store tests
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { entries: Mutex::new(HashMap::new()) })
    }

    /// Raw bytes currently stored under a key
    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().expect("kv lock").get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().expect("kv lock").get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.lock().expect("kv lock").insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().expect("kv lock").remove(key);
        Ok(())
    }
}

/// Cache double storing responses without expiry
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Response>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { entries: Mutex::new(HashMap::new()) })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Response>> {
        Ok(self.entries.lock().expect("cache lock").get(key).cloned())
    }

    async fn set(&self, key: &str, response: Response, _ttl: Option<Duration>) -> Result<()> {
        self.entries.lock().expect("cache lock").insert(key.to_string(), response);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().expect("cache lock").remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().expect("cache lock").clear();
        Ok(())
    }
}

/// Fixed config source for service tests
pub struct StaticSource {
    pub base_url: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl StaticSource {
    pub fn with_base(base_url: &str) -> Arc<Self> {
        Arc::new(Self {
            base_url: Some(base_url.to_string()),
            headers: HashMap::new(),
            timeout: None,
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self { base_url: None, headers: HashMap::new(), timeout: None })
    }
}

impl ConfigSource for StaticSource {
    fn base_url(&self) -> Option<String> {
        self.base_url.clone()
    }

    fn default_headers(&self) -> HashMap<String, String> {
        self.headers.clone()
    }

    fn default_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
