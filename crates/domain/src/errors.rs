//! Error types used throughout the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Courier
///
/// Every component reports failures through this taxonomy so that callers
/// can classify an error without knowing which layer produced it.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum NetError {
    /// Malformed input rejected by the request queue. Never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed input rejected by the offline store or the network
    /// service. Never retried.
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// Transport-level failure. Retryable per policy.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Caller-initiated cancellation. Never retried.
    #[error("Request canceled")]
    Canceled,

    /// Persistence read/write failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Insert would exceed the offline store quota even after eviction.
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Unknown id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation requires connectivity.
    #[error("Network offline")]
    Offline,

    /// A pluggable transport adapter misbehaved.
    #[error("Adapter error: {0}")]
    Adapter(String),

    /// Invariant violation or poisoned lock.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse grouping of [`NetError`] variants for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Transport,
    Canceled,
    Storage,
    Quota,
    Missing,
    Connectivity,
    Adapter,
    Internal,
}

impl NetError {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest(_) | Self::InvalidParam(_) => ErrorCategory::Validation,
            Self::RequestFailed(_) => ErrorCategory::Transport,
            Self::Canceled => ErrorCategory::Canceled,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::QuotaExceeded(_) => ErrorCategory::Quota,
            Self::NotFound(_) => ErrorCategory::Missing,
            Self::Offline => ErrorCategory::Connectivity,
            Self::Adapter(_) => ErrorCategory::Adapter,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the retry policy may re-attempt the operation.
    ///
    /// Only transport-level failures qualify; validation, cancellation,
    /// storage, and quota errors are terminal.
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::RequestFailed(_) | Self::Adapter(_))
    }

    /// Create an `InvalidRequest` error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an `InvalidParam` error.
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidParam(message.into())
    }

    /// Create a `RequestFailed` error.
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::RequestFailed(message.into())
    }

    /// Create a `Storage` error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a `QuotaExceeded` error.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::QuotaExceeded(message.into())
    }

    /// Create a `NotFound` error carrying the offending id.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create an `Adapter` error.
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter(message.into())
    }

    /// Create an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type alias for Courier operations
pub type Result<T> = std::result::Result<T, NetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures_are_retryable() {
        assert!(NetError::request_failed("timeout").should_retry());
        assert!(NetError::adapter("bridge dropped call").should_retry());
    }

    #[test]
    fn test_terminal_errors_are_not_retryable() {
        assert!(!NetError::invalid_request("no url").should_retry());
        assert!(!NetError::invalid_param("no url").should_retry());
        assert!(!NetError::Canceled.should_retry());
        assert!(!NetError::quota_exceeded("1024 > 512").should_retry());
        assert!(!NetError::Offline.should_retry());
        assert!(!NetError::not_found("abc").should_retry());
    }

    #[test]
    fn test_categories_follow_variants() {
        assert_eq!(NetError::invalid_param("x").category(), ErrorCategory::Validation);
        assert_eq!(NetError::request_failed("x").category(), ErrorCategory::Transport);
        assert_eq!(NetError::Canceled.category(), ErrorCategory::Canceled);
        assert_eq!(NetError::Offline.category(), ErrorCategory::Connectivity);
        assert_eq!(NetError::internal("lock").category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_serializes_with_tag_and_message() {
        let err = NetError::not_found("req-1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "NotFound");
        assert_eq!(json["message"], "req-1");
    }
}
