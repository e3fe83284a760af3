//! Request orchestration facade
//!
//! Composes the queue, offline store, cache, and interceptor chain behind
//! a single `send` entry point with per-request cancellation and batching.

mod interceptor;
mod service;
mod types;

pub use interceptor::{InterceptorChain, RequestInterceptor, ResponseInterceptor};
pub use service::NetworkService;
pub use types::{ActiveRequestInfo, BatchOptions, InFlightRequest, ServiceConfig};
