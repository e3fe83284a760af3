//! Bounded-concurrency request dispatch with priority ordering and retry
//!
//! The queue holds a wait-list ordered by priority (descending) with FIFO
//! ties, dispatches at most `concurrency` entries at a time, and re-inserts
//! failed dispatches after a backoff delay until the retry limit is spent.
//! Cancellation always wins: against the wait-list, against a backoff timer,
//! and against an in-flight transport call whose late result is discarded.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use courier_domain::{NetError, RequestConfig, Response, Result};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::metrics::QueueMetrics;
use super::types::{QueueConfig, QueueStats, QueueStatus, SubmittedRequest};
use crate::ports::{Transport, TransportRequest};

/// Wait-list entry ordered by priority, then arrival
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeapEntry {
    priority: i32,
    sequence: u64,
    id: String,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, lower sequence breaking ties
        self.priority.cmp(&other.priority).then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Where a tracked request currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryStatus {
    /// In the wait-list heap
    Pending,
    /// Dispatch task in flight
    Active,
    /// Waiting out a retry delay; re-enters the heap when the timer fires
    Backoff,
}

/// Book-keeping for one tracked request
///
/// Records are removed the moment a request reaches a terminal outcome, so
/// a missing record means "no longer ours": late transport results and
/// expired backoff timers check presence and walk away.
struct EntryRecord {
    config: RequestConfig,
    status: EntryStatus,
    /// Dispatch attempts consumed so far (1-based once dispatched)
    attempt: u32,
    /// Arrival order; reused on retry so a request keeps its FIFO slot
    sequence: u64,
    /// Completion channel, consumed exactly once at the terminal outcome
    completion: Option<oneshot::Sender<Result<Response>>>,
    /// Abort handle for the in-flight dispatch task
    abort: Option<AbortHandle>,
    /// Start of the current dispatch attempt
    dispatched_at: Option<Instant>,
}

struct QueueState {
    waiting: BinaryHeap<HeapEntry>,
    entries: HashMap<String, EntryRecord>,
    active: usize,
    paused: bool,
    sequence: u64,
    shutdown: bool,
}

impl QueueState {
    fn pending_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.status == EntryStatus::Pending).count()
    }
}

struct QueueShared {
    state: Mutex<QueueState>,
    config: QueueConfig,
    metrics: QueueMetrics,
    transport: Arc<dyn Transport>,
}

/// Priority dispatch queue with bounded concurrency
///
/// Cheap to clone; all clones share the same wait-list, counters, and
/// transport.
#[derive(Clone)]
pub struct RequestQueue {
    shared: Arc<QueueShared>,
}

impl RequestQueue {
    /// Create a queue over the given transport
    pub fn new(config: QueueConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate().map_err(NetError::invalid_param)?;

        let state = QueueState {
            waiting: BinaryHeap::new(),
            entries: HashMap::new(),
            active: 0,
            paused: config.start_paused,
            sequence: 0,
            shutdown: false,
        };

        Ok(Self {
            shared: Arc::new(QueueShared {
                state: Mutex::new(state),
                config,
                metrics: QueueMetrics::new(),
                transport,
            }),
        })
    }

    /// Accept a request into the wait-list
    ///
    /// Fails synchronously with `InvalidRequest` when the config carries no
    /// target address, duplicates a queued id, or the queue is shut down.
    /// Dispatch starts immediately unless the queue is paused or saturated.
    pub fn enqueue(&self, config: RequestConfig) -> Result<SubmittedRequest> {
        if !config.has_target() {
            return Err(NetError::invalid_request("request config has no target address"));
        }

        let id = match &config.id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => Uuid::new_v4().to_string(),
        };

        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.state();

            if state.shutdown {
                return Err(NetError::invalid_request("queue has been shut down"));
            }
            if state.entries.contains_key(&id) {
                return Err(NetError::invalid_request(format!(
                    "request id already queued: {}",
                    id
                )));
            }

            state.sequence += 1;
            let sequence = state.sequence;

            state.waiting.push(HeapEntry { priority: config.priority, sequence, id: id.clone() });
            state.entries.insert(
                id.clone(),
                EntryRecord {
                    config,
                    status: EntryStatus::Pending,
                    attempt: 0,
                    sequence,
                    completion: Some(tx),
                    abort: None,
                    dispatched_at: None,
                },
            );

            let pending = state.pending_count();
            self.shared.metrics.record_enqueued(pending);
        }

        debug!(request_id = %id, "request enqueued");
        self.pump();

        Ok(SubmittedRequest::new(id, rx))
    }

    /// Remove the head of the wait-list without dispatching it
    ///
    /// The removed request's ticket resolves as canceled. Returns `None`
    /// when nothing is waiting.
    pub fn dequeue(&self) -> Option<RequestConfig> {
        let (id, mut entry) = {
            let mut state = self.state();
            loop {
                let head = match state.waiting.pop() {
                    Some(head) => head,
                    None => return None,
                };
                let live = state
                    .entries
                    .get(&head.id)
                    .map_or(false, |entry| entry.status == EntryStatus::Pending);
                if !live {
                    // Stale heap entry for a request that already left
                    continue;
                }
                match state.entries.remove(&head.id) {
                    Some(entry) => break (head.id, entry),
                    None => continue,
                }
            }
        };

        if let Some(sender) = entry.completion.take() {
            let _ = sender.send(Err(NetError::Canceled));
        }
        self.shared.metrics.record_canceled(1);
        debug!(request_id = %id, "wait-list head dequeued");

        Some(entry.config)
    }

    /// Stop dispatching; queued and new requests accumulate
    pub fn pause(&self) {
        self.state().paused = true;
        debug!("queue paused");
    }

    /// Resume dispatching in priority order
    pub fn resume(&self) {
        {
            self.state().paused = false;
        }
        debug!("queue resumed");
        self.pump();
    }

    /// Cancel a request wherever it currently lives
    ///
    /// Pending and backoff entries are discarded outright; active entries
    /// have their dispatch task aborted and any late result is dropped. The
    /// ticket resolves as canceled. Returns `false` for unknown ids, making
    /// repeated cancels harmless.
    pub fn cancel(&self, id: &str) -> bool {
        let (entry, freed_active) = {
            let mut state = self.state();

            let entry = match state.entries.remove(id) {
                Some(entry) => entry,
                None => return false,
            };

            let freed_active = entry.status == EntryStatus::Active;
            if freed_active {
                state.active -= 1;
            }
            // A pending heap entry becomes a ghost the dispatcher discards
            (entry, freed_active)
        };

        self.finish_canceled(entry);
        self.shared.metrics.record_canceled(1);
        debug!(request_id = %id, "request canceled");

        if freed_active {
            self.pump();
        }
        true
    }

    /// Cancel every pending request, leaving active dispatches untouched
    ///
    /// Returns the number of requests removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut state = self.state();

            let pending_ids: Vec<String> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.status == EntryStatus::Pending)
                .map(|(id, _)| id.clone())
                .collect();

            let mut removed = Vec::with_capacity(pending_ids.len());
            for id in pending_ids {
                if let Some(entry) = state.entries.remove(&id) {
                    removed.push(entry);
                }
            }
            // Every remaining heap entry is now stale
            state.waiting.clear();
            removed
        };

        let count = removed.len();
        for entry in removed {
            self.finish_canceled(entry);
        }
        if count > 0 {
            self.shared.metrics.record_canceled(count as u64);
            debug!(count, "pending requests cleared");
        }
        count
    }

    /// Cancel everything and refuse further requests
    ///
    /// Returns the number of requests canceled.
    pub fn shutdown(&self) -> usize {
        let removed = {
            let mut state = self.state();
            state.shutdown = true;
            state.waiting.clear();
            let removed: Vec<EntryRecord> =
                state.entries.drain().map(|(_, entry)| entry).collect();
            state.active = 0;
            removed
        };

        let count = removed.len();
        for entry in removed {
            self.finish_canceled(entry);
        }
        if count > 0 {
            self.shared.metrics.record_canceled(count as u64);
        }
        info!(canceled = count, "request queue shut down");
        count
    }

    /// Current occupancy snapshot
    pub fn status(&self) -> QueueStatus {
        let state = self.state();
        QueueStatus {
            pending: state.pending_count(),
            active: state.active,
            paused: state.paused,
        }
    }

    /// Lifetime counter snapshot
    pub fn stats(&self) -> QueueStats {
        self.shared.metrics.snapshot()
    }

    /// Reset the lifetime counters to zero
    pub fn reset_stats(&self) {
        self.shared.metrics.reset();
    }

    /// Dispatch wait-list heads while capacity allows
    fn pump(&self) {
        loop {
            let dispatch = {
                let mut state = self.state();

                if state.shutdown
                    || state.paused
                    || state.active >= self.shared.config.concurrency
                {
                    return;
                }

                let id = loop {
                    let head = match state.waiting.pop() {
                        Some(head) => head,
                        None => return,
                    };
                    let live = state
                        .entries
                        .get(&head.id)
                        .map_or(false, |entry| entry.status == EntryStatus::Pending);
                    if live {
                        break head.id;
                    }
                    // Stale heap entry; keep popping
                };

                let prepared = match state.entries.get_mut(&id) {
                    Some(entry) => {
                        entry.status = EntryStatus::Active;
                        entry.attempt += 1;
                        entry.dispatched_at = Some(Instant::now());
                        Some((id, entry.config.clone(), entry.attempt))
                    }
                    None => None,
                };
                if prepared.is_some() {
                    state.active += 1;
                }
                prepared
            };

            if let Some((id, config, attempt)) = dispatch {
                self.spawn_dispatch(id, config, attempt);
            }
        }
    }

    /// Run one dispatch attempt on its own task
    fn spawn_dispatch(&self, id: String, config: RequestConfig, attempt: u32) {
        self.shared.metrics.record_dispatched();
        debug!(request_id = %id, attempt, "dispatching request");

        let timeout_after = config.timeout.unwrap_or(self.shared.config.dispatch_timeout);
        let queue = self.clone();
        let task_id = id.clone();

        let handle = tokio::spawn(async move {
            let request = TransportRequest::from_config(&config);
            let started = Instant::now();

            let outcome = match tokio::time::timeout(
                timeout_after,
                queue.shared.transport.send(request),
            )
            .await
            {
                Ok(Ok(raw)) => Ok(raw.into_response(&task_id, started.elapsed())),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(NetError::request_failed(format!(
                    "dispatch timed out after {} ms",
                    timeout_after.as_millis()
                ))),
            };

            queue.on_dispatch_result(&task_id, outcome);
        });

        let abort = handle.abort_handle();
        let mut state = self.state();
        match state.entries.get_mut(&id) {
            Some(entry) if entry.status == EntryStatus::Active => entry.abort = Some(abort),
            // Canceled before the handle was registered; stop the task
            _ => abort.abort(),
        }
    }

    /// Settle a finished dispatch attempt
    fn on_dispatch_result(&self, id: &str, outcome: Result<Response>) {
        enum Step {
            Resolve(EntryRecord, Result<Response>),
            Retry(u32),
        }

        let step = {
            let mut state = self.state();

            // A missing or non-active record means cancel won the race;
            // the late result is dropped without touching the counters.
            match state.entries.get(id) {
                Some(entry) if entry.status == EntryStatus::Active => {}
                _ => return,
            }

            state.active -= 1;

            match outcome {
                Ok(response) => match state.entries.remove(id) {
                    Some(entry) => Step::Resolve(entry, Ok(response)),
                    None => return,
                },
                Err(err) => {
                    let (attempt, limit) = match state.entries.get(id) {
                        Some(entry) => {
                            (entry.attempt, self.effective_retry_limit(&entry.config))
                        }
                        None => return,
                    };

                    if err.should_retry() && attempt <= limit {
                        if let Some(entry) = state.entries.get_mut(id) {
                            entry.status = EntryStatus::Backoff;
                            entry.abort = None;
                            entry.dispatched_at = None;
                        }
                        Step::Retry(attempt)
                    } else {
                        match state.entries.remove(id) {
                            Some(entry) => Step::Resolve(entry, Err(err)),
                            None => return,
                        }
                    }
                }
            }
        };

        match step {
            Step::Resolve(mut entry, result) => {
                let processing = entry.dispatched_at.map(|start| start.elapsed());
                match &result {
                    Ok(_) => self.shared.metrics.record_succeeded(processing),
                    Err(err) => {
                        self.shared.metrics.record_failed(processing);
                        debug!(request_id = %id, error = %err, "request failed");
                    }
                }
                if let Some(sender) = entry.completion.take() {
                    let _ = sender.send(result);
                }
            }
            Step::Retry(failed_attempt) => {
                self.shared.metrics.record_retried();
                self.schedule_retry(id.to_string(), failed_attempt);
            }
        }

        self.pump();
    }

    /// Re-insert a request after its backoff delay, unless it was canceled
    fn schedule_retry(&self, id: String, failed_attempt: u32) {
        let delay = self.shared.config.backoff.delay_for(failed_attempt);
        debug!(
            request_id = %id,
            attempt = failed_attempt,
            delay_ms = delay.as_millis() as u64,
            "retry scheduled"
        );

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.requeue_after_backoff(&id);
        });
    }

    fn requeue_after_backoff(&self, id: &str) {
        {
            let mut state = self.state();

            let waiting = match state.entries.get(id) {
                Some(entry) if entry.status == EntryStatus::Backoff => {
                    Some((entry.config.priority, entry.sequence))
                }
                // Canceled or shut down during the delay
                _ => None,
            };

            let (priority, sequence) = match waiting {
                Some(parts) => parts,
                None => return,
            };

            if let Some(entry) = state.entries.get_mut(id) {
                entry.status = EntryStatus::Pending;
            }
            state.waiting.push(HeapEntry { priority, sequence, id: id.to_string() });
        }

        self.pump();
    }

    fn effective_retry_limit(&self, config: &RequestConfig) -> u32 {
        if !config.retry {
            0
        } else {
            config.retry_limit.unwrap_or(self.shared.config.retry_limit)
        }
    }

    /// Abort any in-flight task and resolve the ticket as canceled
    fn finish_canceled(&self, mut entry: EntryRecord) {
        if let Some(abort) = entry.abort.take() {
            abort.abort();
        }
        if let Some(sender) = entry.completion.take() {
            let _ = sender.send(Err(NetError::Canceled));
        }
    }

    /// Lock the queue state, recovering from poisoning
    ///
    /// Every critical section completes its edits before unlocking, so the
    /// state a panicked holder left behind is still coherent.
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
