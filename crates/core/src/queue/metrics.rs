//! Lock-free counters behind the queue monitor

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::types::QueueStats;

/// Atomic counter set backing [`QueueStats`] snapshots
#[derive(Debug, Default)]
pub(crate) struct QueueMetrics {
    enqueued: AtomicU64,
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    canceled: AtomicU64,
    max_pending: AtomicUsize,
    processing_total_millis: AtomicU64,
    processing_samples: AtomicU64,
}

impl QueueMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record an accepted request and the wait-list length after insertion
    pub(crate) fn record_enqueued(&self, pending_now: usize) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.max_pending.fetch_max(pending_now, Ordering::Relaxed);
    }

    /// Record a dispatch attempt handed to the transport
    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful terminal outcome
    pub(crate) fn record_succeeded(&self, processing: Option<Duration>) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_processing(processing);
    }

    /// Record a failed terminal outcome
    pub(crate) fn record_failed(&self, processing: Option<Duration>) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record_processing(processing);
    }

    /// Record a scheduled retry
    pub(crate) fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one or more cancellations
    pub(crate) fn record_canceled(&self, count: u64) {
        self.canceled.fetch_add(count, Ordering::Relaxed);
    }

    fn record_processing(&self, elapsed: Option<Duration>) {
        if let Some(elapsed) = elapsed {
            self.processing_total_millis.fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
            self.processing_samples.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current statistics snapshot
    pub(crate) fn snapshot(&self) -> QueueStats {
        let samples = self.processing_samples.load(Ordering::Relaxed);
        let total_millis = self.processing_total_millis.load(Ordering::Relaxed);
        let avg_processing_ms =
            if samples == 0 { 0.0 } else { total_millis as f64 / samples as f64 };

        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
            max_pending: self.max_pending.load(Ordering::Relaxed),
            avg_processing_ms,
        }
    }

    /// Reset every counter to zero
    pub(crate) fn reset(&self) {
        self.enqueued.store(0, Ordering::Relaxed);
        self.dispatched.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.retried.store(0, Ordering::Relaxed);
        self.canceled.store(0, Ordering::Relaxed);
        self.max_pending.store(0, Ordering::Relaxed);
        self.processing_total_millis.store(0, Ordering::Relaxed);
        self.processing_samples.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_recorded_events() {
        let metrics = QueueMetrics::new();

        metrics.record_enqueued(1);
        metrics.record_enqueued(2);
        metrics.record_dispatched();
        metrics.record_succeeded(Some(Duration::from_millis(40)));
        metrics.record_failed(Some(Duration::from_millis(20)));
        metrics.record_retried();
        metrics.record_canceled(3);

        let stats = metrics.snapshot();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.retried, 1);
        assert_eq!(stats.canceled, 3);
        assert_eq!(stats.max_pending, 2);
        assert_eq!(stats.avg_processing_ms, 30.0);
    }

    #[test]
    fn test_max_pending_keeps_high_water_mark() {
        let metrics = QueueMetrics::new();

        metrics.record_enqueued(5);
        metrics.record_enqueued(2);

        assert_eq!(metrics.snapshot().max_pending, 5);
    }

    #[test]
    fn test_reset_zeroes_all_counters() {
        let metrics = QueueMetrics::new();

        metrics.record_enqueued(4);
        metrics.record_succeeded(Some(Duration::from_millis(10)));
        metrics.reset();

        let stats = metrics.snapshot();
        assert_eq!(stats.enqueued, 0);
        assert_eq!(stats.succeeded, 0);
        assert_eq!(stats.max_pending, 0);
        assert_eq!(stats.avg_processing_ms, 0.0);
    }
}
