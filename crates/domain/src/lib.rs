//! # Courier Domain
//!
//! Business domain types and models for Courier.
//!
//! This crate contains:
//! - Request/response data types (RequestConfig, Response, etc.)
//! - Domain error types and Result definitions
//! - Persisted record types for the offline store
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Courier crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
