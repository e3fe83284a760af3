//! Network service facade composing cache, offline store, queue, and
//! interceptors into one request pipeline
//!
//! Each accepted request runs through its own pipeline task: request
//! interceptors, cache lookup, offline fallback, then queue or direct
//! dispatch, and finally response interceptors and the cache write-back.
//! The task is tracked in an active-request map until it settles, which is
//! what makes cancellation and `active_requests` work.

use std::sync::Arc;
use std::time::Instant;

use courier_domain::{
    NetError, NetworkStatus, RequestConfig, RequestMethod, RequestOutcome, Response,
    ResponseSource, Result,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::interceptor::InterceptorChain;
use super::types::{ActiveRequestInfo, BatchOptions, InFlightRequest, ServiceConfig};
use crate::offline::{OfflineStore, SyncReport};
use crate::ports::{CacheStore, ConfigSource, Connectivity, Transport, TransportRequest};
use crate::queue::RequestQueue;

struct ActiveEntry {
    url: String,
    method: RequestMethod,
    started: Instant,
    abort: Option<AbortHandle>,
}

struct ServiceShared {
    config: ServiceConfig,
    queue: RequestQueue,
    offline: OfflineStore,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
    config_source: Arc<dyn ConfigSource>,
    connectivity: Arc<dyn Connectivity>,
    interceptors: InterceptorChain,
    active: DashMap<String, ActiveEntry>,
}

/// Single entry point for dispatching requests
///
/// Cheap to clone; all clones share the same collaborators and tracking
/// state.
#[derive(Clone)]
pub struct NetworkService {
    shared: Arc<ServiceShared>,
}

impl NetworkService {
    /// Compose a service from its collaborators
    pub fn new(
        config: ServiceConfig,
        queue: RequestQueue,
        offline: OfflineStore,
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheStore>,
        config_source: Arc<dyn ConfigSource>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self> {
        config.validate().map_err(NetError::invalid_param)?;

        Ok(Self {
            shared: Arc::new(ServiceShared {
                config,
                queue,
                offline,
                transport,
                cache,
                config_source,
                connectivity,
                interceptors: InterceptorChain::new(),
                active: DashMap::new(),
            }),
        })
    }

    /// Accept a request and start its pipeline
    ///
    /// Merges defaults from the config source and fails fast with
    /// `InvalidParam` when no absolute target address resolves. The
    /// returned handle carries the id under which the request can be
    /// canceled.
    pub fn send(&self, config: RequestConfig) -> Result<InFlightRequest> {
        let mut prepared = self.prepare(config)?;

        let id = match &prepared.id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => Uuid::new_v4().to_string(),
        };
        // The queue tracks the entry under the same id, so one cancel call
        // reaches both layers.
        prepared.id = Some(id.clone());

        let (tx, rx) = oneshot::channel();

        match self.shared.active.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(NetError::invalid_param(format!(
                    "request id already in flight: {}",
                    id
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(ActiveEntry {
                    url: prepared.url.clone(),
                    method: prepared.method,
                    started: Instant::now(),
                    abort: None,
                });
            }
        }

        let service = self.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            let result = service.run_pipeline(&task_id, prepared).await;
            service.shared.active.remove(&task_id);
            let _ = tx.send(result);
        });

        // The pipeline may already have settled and removed its entry
        if let Some(mut entry) = self.shared.active.get_mut(&id) {
            entry.abort = Some(handle.abort_handle());
        }

        debug!(request_id = %id, "request accepted");
        Ok(InFlightRequest::new(id, rx))
    }

    /// Cancel a tracked request
    ///
    /// Aborts the pipeline task and removes any queue entry travelling
    /// under the same id. Idempotent; returns whether anything was
    /// canceled.
    pub fn cancel(&self, id: &str) -> bool {
        let (_, entry) = match self.shared.active.remove(id) {
            Some(removed) => removed,
            None => return false,
        };

        if let Some(abort) = entry.abort {
            abort.abort();
        }
        // The pipeline may have parked the request in the queue
        self.shared.queue.cancel(id);

        debug!(request_id = %id, "request canceled");
        true
    }

    /// Cancel every tracked request, returning how many were canceled
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<String> =
            self.shared.active.iter().map(|entry| entry.key().clone()).collect();

        let mut canceled = 0;
        for id in ids {
            if self.cancel(&id) {
                canceled += 1;
            }
        }
        if canceled > 0 {
            info!(canceled, "all active requests canceled");
        }
        canceled
    }

    /// Dispatch a set of requests, returning one result per input in order
    ///
    /// Individual failures become `Err` slots and never abort the batch.
    #[instrument(skip(self, configs), fields(count = configs.len(), parallel = options.parallel))]
    pub async fn batch(
        &self,
        configs: Vec<RequestConfig>,
        options: BatchOptions,
    ) -> Vec<Result<RequestOutcome>> {
        let skip_queue = options.skip_queue;

        if options.parallel {
            let max_concurrent = options.max_concurrent.max(1);
            stream::iter(configs.into_iter().map(|mut config| {
                if skip_queue {
                    config.skip_queue = true;
                }
                let service = self.clone();
                async move { service.dispatch_one(config).await }
            }))
            .buffered(max_concurrent)
            .collect()
            .await
        } else {
            let mut results = Vec::with_capacity(configs.len());
            for mut config in configs {
                if skip_queue {
                    config.skip_queue = true;
                }
                results.push(self.dispatch_one(config).await);
            }
            results
        }
    }

    /// Snapshot of every request currently in the pipeline
    pub fn active_requests(&self) -> Vec<ActiveRequestInfo> {
        self.shared
            .active
            .iter()
            .map(|entry| ActiveRequestInfo {
                id: entry.key().clone(),
                url: entry.value().url.clone(),
                method: entry.value().method,
                elapsed: entry.value().started.elapsed(),
            })
            .collect()
    }

    /// Drop every cached response
    pub async fn clear_cache(&self) -> Result<()> {
        self.shared.cache.clear().await
    }

    /// Trigger a sync pass on the offline store
    pub async fn sync_offline(&self) -> Result<SyncReport> {
        self.shared.offline.sync().await
    }

    /// Current connectivity snapshot
    pub fn network_status(&self) -> NetworkStatus {
        self.shared.connectivity.status()
    }

    /// Interceptor registry applied to every request
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.shared.interceptors
    }

    async fn dispatch_one(&self, config: RequestConfig) -> Result<RequestOutcome> {
        self.send(config)?.outcome().await
    }

    async fn run_pipeline(&self, id: &str, config: RequestConfig) -> Result<RequestOutcome> {
        let config = self.shared.interceptors.apply_request(config)?;

        let cache_key = cache_key(&config);
        if config.use_cache && !config.force_refresh {
            match self.shared.cache.get(&cache_key).await {
                Ok(Some(mut hit)) => {
                    debug!(request_id = %id, "serving response from cache");
                    hit.request_id = id.to_string();
                    hit.source = ResponseSource::Cache;
                    return self
                        .shared
                        .interceptors
                        .apply_response(RequestOutcome::Completed(hit));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(request_id = %id, error = %err, "cache lookup failed; dispatching");
                }
            }
        }

        if !self.shared.connectivity.is_online() {
            let record_id = self.shared.offline.save(config).await?;
            info!(
                request_id = %id,
                record_id = %record_id,
                "offline; request stored for later delivery"
            );
            return self
                .shared
                .interceptors
                .apply_response(RequestOutcome::StoredOffline { record_id });
        }

        let use_cache = config.use_cache;
        let cache_ttl = config.cache_ttl;

        let response = if config.skip_queue {
            self.direct_dispatch(id, &config).await?
        } else {
            self.shared.queue.enqueue(config)?.wait().await?
        };

        let outcome =
            self.shared.interceptors.apply_response(RequestOutcome::Completed(response))?;

        if use_cache {
            if let RequestOutcome::Completed(response) = &outcome {
                if response.is_success() {
                    let ttl = Some(cache_ttl.unwrap_or(self.shared.config.cache_ttl));
                    if let Err(err) =
                        self.shared.cache.set(&cache_key, response.clone(), ttl).await
                    {
                        warn!(request_id = %id, error = %err, "cache write failed");
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// One transport attempt outside the queue, with the same timeout
    /// handling the queue applies
    async fn direct_dispatch(&self, id: &str, config: &RequestConfig) -> Result<Response> {
        let timeout_after = config.timeout.unwrap_or(self.shared.config.default_timeout);
        let request = TransportRequest::from_config(config);
        let started = Instant::now();

        match tokio::time::timeout(timeout_after, self.shared.transport.send(request)).await {
            Ok(Ok(raw)) => Ok(raw.into_response(id, started.elapsed())),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(NetError::request_failed(format!(
                "request timed out after {} ms",
                timeout_after.as_millis()
            ))),
        }
    }

    /// Merge config-source defaults and resolve the target address
    fn prepare(&self, mut config: RequestConfig) -> Result<RequestConfig> {
        if !config.has_target() {
            return Err(NetError::invalid_param("request config has no target address"));
        }

        if Url::parse(&config.url).is_err() {
            let base = match self.shared.config_source.base_url() {
                Some(base) => base,
                None => {
                    return Err(NetError::invalid_param(format!(
                        "no absolute target address resolves for {}",
                        config.url
                    )));
                }
            };
            let joined = join_address(&base, &config.url);
            Url::parse(&joined).map_err(|err| {
                NetError::invalid_param(format!("invalid target address {}: {}", joined, err))
            })?;
            config.url = joined;
        }

        // Request headers win over source defaults
        for (name, value) in self.shared.config_source.default_headers() {
            config.headers.entry(name).or_insert(value);
        }

        if config.timeout.is_none() {
            config.timeout = self.shared.config_source.default_timeout();
        }
        if config.timeout.is_none() {
            config.timeout = Some(self.shared.config.default_timeout);
        }

        Ok(config)
    }
}

/// Join a base address and a relative path, preserving the base path
/// segment rather than resolving it away
fn join_address(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Deterministic cache key over method, address, and body
fn cache_key(config: &RequestConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.method.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(config.url.as_bytes());
    hasher.update(b"|");
    if let Some(body) = &config.body {
        hasher.update(body.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
