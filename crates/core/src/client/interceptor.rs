//! Ordered request and response interceptor registry

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use courier_domain::{RequestConfig, RequestOutcome, Result};

/// Transform-or-reject hook applied to outgoing request configs
pub type RequestInterceptor = Arc<dyn Fn(RequestConfig) -> Result<RequestConfig> + Send + Sync>;

/// Transform-or-reject hook applied to pipeline outcomes
pub type ResponseInterceptor =
    Arc<dyn Fn(RequestOutcome) -> Result<RequestOutcome> + Send + Sync>;

/// Registry of interceptors applied in registration order
///
/// Request hooks run before dispatch; response hooks run on whatever the
/// pipeline produced, including cache hits and offline short-circuits. A
/// hook returning an error rejects the request, and that error becomes the
/// request's outcome.
#[derive(Default)]
pub struct InterceptorChain {
    request: Mutex<Vec<(u64, RequestInterceptor)>>,
    response: Mutex<Vec<(u64, ResponseInterceptor)>>,
    next_id: AtomicU64,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request hook, returning the id that removes it
    pub fn add_request<F>(&self, interceptor: F) -> u64
    where
        F: Fn(RequestConfig) -> Result<RequestConfig> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_request().push((id, Arc::new(interceptor)));
        id
    }

    /// Register a response hook, returning the id that removes it
    pub fn add_response<F>(&self, interceptor: F) -> u64
    where
        F: Fn(RequestOutcome) -> Result<RequestOutcome> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_response().push((id, Arc::new(interceptor)));
        id
    }

    /// Eject a hook by id, from whichever list holds it
    pub fn remove(&self, id: u64) -> bool {
        {
            let mut request = self.lock_request();
            if let Some(position) = request.iter().position(|(hook_id, _)| *hook_id == id) {
                request.remove(position);
                return true;
            }
        }

        let mut response = self.lock_response();
        if let Some(position) = response.iter().position(|(hook_id, _)| *hook_id == id) {
            response.remove(position);
            return true;
        }
        false
    }

    /// Number of registered hooks across both lists
    pub fn len(&self) -> usize {
        self.lock_request().len() + self.lock_response().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the request hooks in registration order
    pub(crate) fn apply_request(&self, config: RequestConfig) -> Result<RequestConfig> {
        let hooks: Vec<RequestInterceptor> =
            self.lock_request().iter().map(|(_, hook)| Arc::clone(hook)).collect();

        let mut current = config;
        for hook in hooks {
            current = hook(current)?;
        }
        Ok(current)
    }

    /// Run the response hooks in registration order
    pub(crate) fn apply_response(&self, outcome: RequestOutcome) -> Result<RequestOutcome> {
        let hooks: Vec<ResponseInterceptor> =
            self.lock_response().iter().map(|(_, hook)| Arc::clone(hook)).collect();

        let mut current = outcome;
        for hook in hooks {
            current = hook(current)?;
        }
        Ok(current)
    }

    fn lock_request(&self) -> MutexGuard<'_, Vec<(u64, RequestInterceptor)>> {
        self.request.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_response(&self) -> MutexGuard<'_, Vec<(u64, ResponseInterceptor)>> {
        self.response.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
