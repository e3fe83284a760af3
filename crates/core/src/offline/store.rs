//! Quota-bound offline request store with sync reconciliation
//!
//! Requests that cannot be sent are persisted as an array-valued record
//! through the key-value port and replayed oldest-first once connectivity
//! returns. The store owns its quota (oldest records are evicted to make
//! room), its retry policy, and the watcher task that reacts to
//! offline-to-online transitions.

use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use courier_domain::{NetError, PersistedRequest, RecordStatus, RequestConfig, Result};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::types::{OfflineConfig, StoreStats, SyncReport};
use crate::ports::{Connectivity, KeyValueStore, Transport, TransportRequest};

/// How long `stop` waits for the watcher task to wind down
const WATCHER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

type WatcherHandle = Mutex<Option<JoinHandle<()>>>;

struct StoreShared {
    config: OfflineConfig,
    kv: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    connectivity: Arc<dyn Connectivity>,
    /// Held across a whole sync pass, so passes serialize against every
    /// mutating operation.
    records: Mutex<Vec<PersistedRequest>>,
    watcher_task: WatcherHandle,
    cancel: StdMutex<CancellationToken>,
}

impl Drop for StoreShared {
    fn drop(&mut self) {
        // Stop a watcher that outlived every handle
        let running = self.watcher_task.try_lock().map(|guard| guard.is_some()).unwrap_or(true);
        let token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if running && !token.is_cancelled() {
            warn!("offline store dropped with watcher running; cancelling");
            token.cancel();
        }
    }
}

/// Durable store for requests awaiting connectivity
///
/// Cheap to clone; all clones share the same record set and watcher.
#[derive(Clone)]
pub struct OfflineStore {
    shared: Arc<StoreShared>,
}

impl OfflineStore {
    /// Open the store, loading any previously persisted records
    ///
    /// A payload that no longer parses is dropped with a warning rather
    /// than wedging the store; the next mutation overwrites it.
    pub async fn open(
        config: OfflineConfig,
        kv: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self> {
        config.validate().map_err(NetError::invalid_param)?;

        let records = match kv.get(&config.storage_key).await? {
            Some(bytes) => match serde_json::from_slice::<Vec<PersistedRequest>>(&bytes) {
                Ok(records) => records,
                Err(err) => {
                    warn!(
                        key = %config.storage_key,
                        error = %err,
                        "persisted offline records are unreadable; starting empty"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        debug!(count = records.len(), key = %config.storage_key, "offline store opened");

        Ok(Self {
            shared: Arc::new(StoreShared {
                config,
                kv,
                transport,
                connectivity,
                records: Mutex::new(records),
                watcher_task: Mutex::new(None),
                cancel: StdMutex::new(CancellationToken::new()),
            }),
        })
    }

    /// Persist a request for later delivery
    ///
    /// Evicts oldest records first when the quota would overflow; if the
    /// request still cannot fit, nothing changes and `QuotaExceeded` is
    /// returned. The record is written through the key-value port before
    /// the in-memory set adopts it. When online with auto-sync enabled, a
    /// flush is spawned immediately.
    #[instrument(skip(self, config), fields(url = %config.url))]
    pub async fn save(&self, config: RequestConfig) -> Result<String> {
        if !config.has_target() {
            return Err(NetError::invalid_param("request config has no target address"));
        }

        let record = PersistedRequest::from_config(&config);
        let record_id = record.id.clone();
        let record_size = record.estimated_size();

        {
            let mut records = self.shared.records.lock().await;

            if records.iter().any(|existing| existing.id == record.id) {
                return Err(NetError::invalid_param(format!(
                    "offline record id already stored: {}",
                    record.id
                )));
            }

            // Plan the insert on a scratch copy so a failure at any point
            // leaves both memory and the persisted record untouched. The
            // quota applies to the serialized array, framing bytes
            // included, matching what `persist` writes.
            let mut scratch = records.clone();
            scratch.push(record);

            let mut evicted = 0usize;
            while backlog_bytes(&scratch) > self.shared.config.max_bytes && scratch.len() > 1 {
                // The incoming record sits last and is never a candidate
                let oldest = scratch[..scratch.len() - 1]
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, record)| record.created_at)
                    .map(|(idx, _)| idx);
                match oldest {
                    Some(idx) => {
                        scratch.remove(idx);
                        evicted += 1;
                    }
                    None => break,
                }
            }

            if backlog_bytes(&scratch) > self.shared.config.max_bytes {
                return Err(NetError::quota_exceeded(format!(
                    "record of {} bytes cannot fit the {}-byte quota",
                    record_size, self.shared.config.max_bytes
                )));
            }

            self.persist(&scratch).await?;
            *records = scratch;

            if evicted > 0 {
                debug!(evicted, "evicted oldest offline records to free quota");
            }
        }

        debug!(record_id = %record_id, "request stored offline");

        if self.shared.config.auto_sync && self.shared.connectivity.is_online() {
            let store = self.clone();
            tokio::spawn(async move {
                if let Err(err) = store.sync().await {
                    warn!(error = %err, "flush after save failed");
                }
            });
        }

        Ok(record_id)
    }

    /// All stored records, in storage order
    pub async fn requests(&self) -> Vec<PersistedRequest> {
        self.shared.records.lock().await.clone()
    }

    /// Records still awaiting delivery
    pub async fn pending_requests(&self) -> Vec<PersistedRequest> {
        self.shared
            .records
            .lock()
            .await
            .iter()
            .filter(|record| record.is_pending())
            .cloned()
            .collect()
    }

    /// Remove a single record by id
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut records = self.shared.records.lock().await;

        let position = match records.iter().position(|record| record.id == id) {
            Some(position) => position,
            None => return Err(NetError::not_found(format!("offline record {}", id))),
        };

        let mut scratch = records.clone();
        scratch.remove(position);
        self.persist(&scratch).await?;
        *records = scratch;

        debug!(record_id = %id, "offline record removed");
        Ok(())
    }

    /// Drop every stored record, returning how many were removed
    pub async fn clear(&self) -> Result<usize> {
        let mut records = self.shared.records.lock().await;

        let count = records.len();
        if count == 0 {
            return Ok(0);
        }

        self.persist(&[]).await?;
        records.clear();

        debug!(count, "offline records cleared");
        Ok(count)
    }

    /// Occupancy and connectivity snapshot
    pub async fn stats(&self) -> StoreStats {
        let records = self.shared.records.lock().await;
        let pending = records.iter().filter(|record| record.is_pending()).count();
        let used_bytes = backlog_bytes(&records);

        StoreStats {
            total: records.len(),
            pending,
            failed: records.len() - pending,
            used_bytes,
            max_bytes: self.shared.config.max_bytes,
            is_online: self.shared.connectivity.is_online(),
        }
    }

    /// Attempt delivery of every pending record, oldest first
    ///
    /// A record is removed only after its transport call succeeds. A failed
    /// delivery increments the record's retry count; once the count exceeds
    /// the configured limit the record is marked failed and retained until
    /// removed explicitly. Fails with `Offline` when no connectivity is
    /// available.
    #[instrument(skip(self), fields(key = %self.shared.config.storage_key))]
    pub async fn sync(&self) -> Result<SyncReport> {
        if !self.shared.connectivity.is_online() {
            return Err(NetError::Offline);
        }

        let started = Instant::now();
        let mut records = self.shared.records.lock().await;

        let mut pending: Vec<(u64, String)> = records
            .iter()
            .filter(|record| record.is_pending())
            .map(|record| (record.created_at, record.id.clone()))
            .collect();
        pending.sort();

        let attempted = pending.len();
        let mut delivered = 0usize;
        let mut retried = 0usize;
        let mut failed = 0usize;
        let mut errors: Vec<(String, String)> = Vec::new();
        let mut dirty = false;

        for (_, id) in pending {
            let request = match records.iter().find(|record| record.id == id) {
                Some(record) => delivery_request(record),
                None => continue,
            };

            match self.shared.transport.send(request).await {
                Ok(_) => {
                    records.retain(|record| record.id != id);
                    delivered += 1;
                    dirty = true;
                }
                Err(err) => {
                    if let Some(record) = records.iter_mut().find(|record| record.id == id) {
                        record.retry_count += 1;
                        if record.retry_count > self.shared.config.retry_limit {
                            record.status = RecordStatus::Failed;
                            failed += 1;
                            debug!(record_id = %id, "offline record exhausted its retries");
                        } else {
                            retried += 1;
                        }
                        dirty = true;
                    }
                    errors.push((id, err.to_string()));
                }
            }
        }

        // Deliveries are irreversible, so the in-memory set keeps its
        // post-delivery shape even if this write fails.
        if dirty {
            self.persist(&records).await?;
        }

        let report = SyncReport {
            attempted,
            delivered,
            retried,
            failed,
            errors,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            attempted = report.attempted,
            delivered = report.delivered,
            retried = report.retried,
            failed = report.failed,
            "offline sync pass finished"
        );

        Ok(report)
    }

    /// Start the connectivity watcher
    ///
    /// The watcher syncs on every offline-to-online transition and, when an
    /// interval is configured, periodically while online with pending
    /// records. Fails if a watcher is already running.
    pub async fn start(&self) -> Result<()> {
        let mut task = self.shared.watcher_task.lock().await;
        if task.as_ref().map_or(false, |handle| !handle.is_finished()) {
            return Err(NetError::internal("offline watcher already running"));
        }

        let token = CancellationToken::new();
        *self.shared.cancel.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();

        let shared = Arc::downgrade(&self.shared);
        let handle = tokio::spawn(async move {
            watch_loop(shared, token).await;
        });
        *task = Some(handle);

        info!("offline watcher started");
        Ok(())
    }

    /// Stop the watcher and wait for it to finish
    ///
    /// Harmless when no watcher is running.
    pub async fn stop(&self) -> Result<()> {
        self.shared.cancel.lock().unwrap_or_else(PoisonError::into_inner).cancel();

        let handle = self.shared.watcher_task.lock().await.take();
        if let Some(handle) = handle {
            tokio::time::timeout(WATCHER_JOIN_TIMEOUT, handle)
                .await
                .map_err(|_| {
                    NetError::internal(format!(
                        "offline watcher did not stop within {:?}",
                        WATCHER_JOIN_TIMEOUT
                    ))
                })?
                .map_err(|err| {
                    NetError::internal(format!("offline watcher task failed: {}", err))
                })?;
            info!("offline watcher stopped");
        }

        Ok(())
    }

    /// Whether the watcher task is currently running
    pub fn is_running(&self) -> bool {
        self.shared
            .watcher_task
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Tear down the watcher; persisted records remain for the next open
    pub async fn shutdown(&self) -> Result<()> {
        self.stop().await
    }

    async fn persist(&self, records: &[PersistedRequest]) -> Result<()> {
        let bytes = serde_json::to_vec(records)
            .map_err(|err| NetError::storage(format!("serialize offline records: {}", err)))?;
        self.shared.kv.set(&self.shared.config.storage_key, bytes).await
    }
}

/// Byte length the record array occupies once persisted
///
/// `serde_json` renders the array compactly, so the total is the record
/// payloads plus one byte per separator and the surrounding brackets.
fn backlog_bytes(records: &[PersistedRequest]) -> usize {
    if records.is_empty() {
        return 2;
    }
    let payload: usize = records.iter().map(PersistedRequest::estimated_size).sum();
    payload + records.len() + 1
}

/// Build the transport descriptor for a stored record
fn delivery_request(record: &PersistedRequest) -> TransportRequest {
    TransportRequest {
        url: record.url.clone(),
        method: record.method,
        headers: record.headers.clone(),
        body: record.data.clone(),
        timeout: None,
    }
}

/// Background task reacting to connectivity changes and the sync interval
///
/// Holds only a weak reference so dropping the last store handle tears the
/// watcher down instead of keeping the store alive forever.
async fn watch_loop(shared: Weak<StoreShared>, cancel: CancellationToken) {
    let (mut connectivity_rx, mut was_online, interval) = match shared.upgrade() {
        Some(shared) => (
            shared.connectivity.subscribe(),
            shared.connectivity.is_online(),
            shared.config.sync_interval,
        ),
        None => return,
    };

    // The ticker lives outside the loop; a timer rebuilt per iteration
    // would reset whenever connectivity traffic wakes the select
    let mut ticker = interval.map(|period| {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("offline watcher cancelled");
                break;
            }
            changed = connectivity_rx.changed() => {
                if changed.is_err() {
                    debug!("connectivity channel closed; offline watcher exiting");
                    break;
                }
                let is_online = connectivity_rx.borrow_and_update().is_online;
                let came_online = is_online && !was_online;
                was_online = is_online;

                if came_online {
                    let store = match shared.upgrade() {
                        Some(shared) => OfflineStore { shared },
                        None => break,
                    };
                    debug!("connectivity restored; syncing offline records");
                    if let Err(err) = store.sync().await {
                        warn!(error = %err, "reconnect sync failed");
                    }
                }
            }
            _ = next_tick(ticker.as_mut()) => {
                let store = match shared.upgrade() {
                    Some(shared) => OfflineStore { shared },
                    None => break,
                };
                if store.shared.connectivity.is_online()
                    && !store.pending_requests().await.is_empty()
                {
                    if let Err(err) = store.sync().await {
                        warn!(error = %err, "periodic sync failed");
                    }
                }
            }
        }
    }
}

/// Wait for the next periodic tick, or forever when no interval is set
///
/// `Interval::tick` is cancel safe: losing the select race leaves a due
/// tick pending instead of consuming it.
async fn next_tick(ticker: Option<&mut tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
