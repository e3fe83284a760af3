//! Integration tests for the request queue
//!
//! **Purpose**: Exercise dispatch scheduling end to end against a scripted
//! transport
//!
//! **Coverage:**
//! - Concurrency cap honored under saturation
//! - Priority-descending, FIFO-tied dispatch order
//! - Retry budget: limit + 1 attempts, then terminal failure
//! - Cancel beating an in-flight dispatch and a scheduled retry
//! - Pause/resume, clear, shutdown, and counter bookkeeping
//!
//! **Infrastructure:**
//! - Scripted transport double (no network)

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::time::Duration;

use courier_common::BackoffPolicy;
use courier_core::{QueueConfig, RequestQueue};
use courier_domain::{NetError, RequestConfig};
use support::ScriptedTransport;

fn fast_retry(retry_limit: u32) -> QueueConfig {
    QueueConfig {
        retry_limit,
        backoff: BackoffPolicy::fixed(Duration::from_millis(5)),
        ..QueueConfig::default()
    }
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrency_never_exceeds_cap() {
    let transport = ScriptedTransport::with_delay(Duration::from_millis(25));
    let config = QueueConfig { concurrency: 2, ..QueueConfig::default() };
    let queue = RequestQueue::new(config, transport.clone()).unwrap();

    let mut submitted = Vec::new();
    for index in 0..8 {
        submitted.push(queue.enqueue(RequestConfig::new(format!("/job/{}", index))).unwrap());
    }
    for handle in submitted {
        handle.wait().await.unwrap();
    }

    assert_eq!(transport.calls(), 8);
    assert!(transport.max_in_flight() <= 2, "cap breached: {}", transport.max_in_flight());

    let stats = queue.stats();
    assert_eq!(stats.succeeded, 8);
    assert_eq!(stats.failed, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_priority_order_after_resume() {
    let transport = ScriptedTransport::ok();
    let config =
        QueueConfig { concurrency: 1, start_paused: true, ..QueueConfig::default() };
    let queue = RequestQueue::new(config, transport.clone()).unwrap();

    let low = queue.enqueue(RequestConfig::new("/p1").with_priority(1)).unwrap();
    let high = queue.enqueue(RequestConfig::new("/p10").with_priority(10)).unwrap();
    let mid = queue.enqueue(RequestConfig::new("/p5").with_priority(5)).unwrap();

    queue.resume();
    let (a, b, c) = tokio::join!(low.wait(), high.wait(), mid.wait());
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(transport.sent(), vec!["/p10", "/p5", "/p1"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_equal_priority_dispatches_fifo() {
    let transport = ScriptedTransport::ok();
    let config =
        QueueConfig { concurrency: 1, start_paused: true, ..QueueConfig::default() };
    let queue = RequestQueue::new(config, transport.clone()).unwrap();

    let first = queue.enqueue(RequestConfig::new("/first")).unwrap();
    let second = queue.enqueue(RequestConfig::new("/second")).unwrap();
    let third = queue.enqueue(RequestConfig::new("/third")).unwrap();

    queue.resume();
    let (a, b, c) = tokio::join!(first.wait(), second.wait(), third.wait());
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(transport.sent(), vec!["/first", "/second", "/third"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_holds_new_dispatches_only() {
    let transport = ScriptedTransport::with_delay(Duration::from_millis(50));
    let config = QueueConfig { concurrency: 2, ..QueueConfig::default() };
    let queue = RequestQueue::new(config, transport.clone()).unwrap();

    let mut submitted = Vec::new();
    for index in 0..4 {
        submitted.push(queue.enqueue(RequestConfig::new(format!("/job/{}", index))).unwrap());
    }

    // Two are dispatched, two wait; pausing must not interrupt the two in
    // flight but must hold the rest.
    tokio::time::sleep(Duration::from_millis(10)).await;
    queue.pause();
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(transport.calls(), 2);
    let status = queue.status();
    assert_eq!(status.pending, 2);
    assert_eq!(status.active, 0);
    assert!(status.paused);

    queue.resume();
    for handle in submitted {
        handle.wait().await.unwrap();
    }
    assert_eq!(transport.calls(), 4);
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_retry_budget_is_limit_plus_one_attempts() {
    let transport = ScriptedTransport::script(vec![
        Err(NetError::request_failed("boom")),
        Err(NetError::request_failed("boom")),
        Err(NetError::request_failed("boom")),
        Err(NetError::request_failed("boom")),
    ]);
    let queue = RequestQueue::new(fast_retry(3), transport.clone()).unwrap();

    let submitted = queue.enqueue(RequestConfig::new("/flaky")).unwrap();
    let err = submitted.wait().await.unwrap_err();

    assert!(matches!(err, NetError::RequestFailed(_)));
    assert_eq!(transport.calls(), 4, "retry_limit 3 means exactly 4 attempts");

    let stats = queue.stats();
    assert_eq!(stats.retried, 3);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.succeeded, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retry_recovers_after_transient_failures() {
    let transport = ScriptedTransport::script(vec![
        Err(NetError::request_failed("transient")),
        Err(NetError::request_failed("transient")),
    ]);
    let queue = RequestQueue::new(fast_retry(3), transport.clone()).unwrap();

    let submitted = queue.enqueue(RequestConfig::new("/recovers")).unwrap();
    let response = submitted.wait().await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 3);

    let stats = queue.stats();
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.succeeded, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_retryable_error_fails_fast() {
    let transport =
        ScriptedTransport::script(vec![Err(NetError::invalid_request("rejected"))]);
    let queue = RequestQueue::new(fast_retry(3), transport.clone()).unwrap();

    let submitted = queue.enqueue(RequestConfig::new("/bad")).unwrap();
    let err = submitted.wait().await.unwrap_err();

    assert!(matches!(err, NetError::InvalidRequest(_)));
    assert_eq!(transport.calls(), 1);
    assert_eq!(queue.stats().retried, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_can_opt_out_of_retry() {
    let transport = ScriptedTransport::script(vec![Err(NetError::request_failed("boom"))]);
    let queue = RequestQueue::new(fast_retry(3), transport.clone()).unwrap();

    let submitted = queue.enqueue(RequestConfig::new("/once").without_retry()).unwrap();
    submitted.wait().await.unwrap_err();

    assert_eq!(transport.calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_retry_limit_overrides_queue_default() {
    let transport = ScriptedTransport::script(vec![
        Err(NetError::request_failed("boom")),
        Err(NetError::request_failed("boom")),
        Err(NetError::request_failed("boom")),
    ]);
    let queue = RequestQueue::new(fast_retry(0), transport.clone()).unwrap();

    let submitted =
        queue.enqueue(RequestConfig::new("/custom").with_retry_limit(2)).unwrap();
    submitted.wait().await.unwrap_err();

    assert_eq!(transport.calls(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispatch_timeout_is_retryable() {
    let transport = ScriptedTransport::with_delay(Duration::from_millis(300));
    let queue = RequestQueue::new(fast_retry(1), transport.clone()).unwrap();

    let config = RequestConfig::new("/slow").with_timeout(Duration::from_millis(40));
    let submitted = queue.enqueue(config).unwrap();
    let err = submitted.wait().await.unwrap_err();

    assert!(matches!(err, NetError::RequestFailed(_)));
    assert_eq!(transport.calls(), 2, "timed-out attempt must be retried");
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_wins_against_in_flight_dispatch() {
    let transport = ScriptedTransport::with_delay(Duration::from_millis(150));
    let queue = RequestQueue::new(QueueConfig::default(), transport.clone()).unwrap();

    let submitted = queue.enqueue(RequestConfig::new("/racing")).unwrap();
    let id = submitted.id().to_string();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(queue.status().active, 1);

    assert!(queue.cancel(&id));
    let err = submitted.wait().await.unwrap_err();
    assert!(matches!(err, NetError::Canceled));

    // The aborted attempt's result must not surface in the counters
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stats = queue.stats();
    assert_eq!(stats.canceled, 1);
    assert_eq!(stats.succeeded, 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(queue.status().active, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_during_backoff_prevents_requeue() {
    let transport = ScriptedTransport::script(vec![Err(NetError::request_failed("boom"))]);
    let config = QueueConfig {
        retry_limit: 3,
        backoff: BackoffPolicy::fixed(Duration::from_millis(150)),
        ..QueueConfig::default()
    };
    let queue = RequestQueue::new(config, transport.clone()).unwrap();

    let submitted = queue.enqueue(RequestConfig::new("/backoff")).unwrap();
    let id = submitted.id().to_string();

    // Let the first attempt fail and the retry timer start
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(queue.cancel(&id));

    let err = submitted.wait().await.unwrap_err();
    assert!(matches!(err, NetError::Canceled));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(transport.calls(), 1, "canceled request must not be requeued");
    assert_eq!(queue.status().pending, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_cancels_pending_and_is_idempotent() {
    let transport = ScriptedTransport::ok();
    let config = QueueConfig { start_paused: true, ..QueueConfig::default() };
    let queue = RequestQueue::new(config, transport.clone()).unwrap();

    let mut submitted = Vec::new();
    for index in 0..3 {
        submitted.push(queue.enqueue(RequestConfig::new(format!("/job/{}", index))).unwrap());
    }

    assert_eq!(queue.clear(), 3);
    assert_eq!(queue.clear(), 0);

    for handle in submitted {
        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, NetError::Canceled));
    }

    queue.resume();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.calls(), 0);
    assert_eq!(queue.stats().canceled, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_cancels_everything() {
    let transport = ScriptedTransport::with_delay(Duration::from_millis(200));
    let config = QueueConfig { concurrency: 2, ..QueueConfig::default() };
    let queue = RequestQueue::new(config, transport.clone()).unwrap();

    let first = queue.enqueue(RequestConfig::new("/a")).unwrap();
    let second = queue.enqueue(RequestConfig::new("/b")).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(queue.shutdown(), 2);

    let err = first.wait().await.unwrap_err();
    assert!(matches!(err, NetError::Canceled));
    let err = second.wait().await.unwrap_err();
    assert!(matches!(err, NetError::Canceled));

    tokio::time::sleep(Duration::from_millis(250)).await;
    let stats = queue.stats();
    assert_eq!(stats.canceled, 2);
    assert_eq!(stats.succeeded, 0);
}

// ============================================================================
// Counters
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_stats_track_depth_and_processing_time() {
    let transport = ScriptedTransport::with_delay(Duration::from_millis(20));
    let config = QueueConfig { concurrency: 1, ..QueueConfig::default() };
    let queue = RequestQueue::new(config, transport.clone()).unwrap();

    let mut submitted = Vec::new();
    for index in 0..3 {
        submitted.push(queue.enqueue(RequestConfig::new(format!("/job/{}", index))).unwrap());
    }
    for handle in submitted {
        handle.wait().await.unwrap();
    }

    let stats = queue.stats();
    assert_eq!(stats.enqueued, 3);
    assert_eq!(stats.dispatched, 3);
    assert_eq!(stats.succeeded, 3);
    assert_eq!(stats.max_pending, 2, "two waited while the first was active");
    assert!(stats.avg_processing_ms >= 10.0, "got {}", stats.avg_processing_ms);

    queue.reset_stats();
    let stats = queue.stats();
    assert_eq!(stats.enqueued, 0);
    assert_eq!(stats.max_pending, 0);
    assert_eq!(stats.avg_processing_ms, 0.0);
}
