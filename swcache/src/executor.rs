use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use swcache_backend::{PartitionName, Store};
use swcache_core::{Clock, Request, RequestKey, Response, StoredResponse, Transport};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::offload::{OffloadKey, OffloadManager};
use crate::policy::{Policy, Strategy};
use crate::worker::Worker;

/// Where a response handed to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    /// A stored snapshot.
    Cache,
    /// A live network response.
    Network,
    /// The offline page, served because network and cache both missed.
    OfflineFallback,
    /// The built-in 503 answer for unreachable streams.
    Synthesized,
}

impl ResponseSource {
    /// Stable name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
            Self::OfflineFallback => "offline-fallback",
            Self::Synthesized => "synthesized",
        }
    }
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// The response to hand back to the caller.
    pub response: Response,
    /// Where it came from.
    pub source: ResponseSource,
}

impl Fetched {
    fn new(response: Response, source: ResponseSource) -> Self {
        Self { response, source }
    }

    /// Drops the provenance.
    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Runs fetch strategies against a store and a transport.
///
/// Store failures never fail a fetch: a failed read counts as a miss and a
/// failed write is logged.
pub struct Executor<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    clock: Arc<dyn Clock>,
    offload: OffloadManager,
}

impl<S, T> Clone for Executor<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            transport: self.transport.clone(),
            clock: self.clock.clone(),
            offload: self.offload.clone(),
        }
    }
}

impl<S, T> Executor<S, T>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    /// Creates an executor.
    pub fn new(
        store: Arc<S>,
        transport: Arc<T>,
        clock: Arc<dyn Clock>,
        offload: OffloadManager,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            offload,
        }
    }

    /// The manager running background refreshes.
    pub fn offload(&self) -> &OffloadManager {
        &self.offload
    }

    /// Serves `request` with `policy` over the partitions of `worker`.
    pub async fn execute(
        &self,
        worker: &Worker,
        policy: Policy,
        request: &Request,
    ) -> Result<Fetched, FetchError> {
        let partition = worker.partition(policy.partition);
        let fallback_on_server_error = worker.config().network_first.fallback_on_server_error;
        match policy.strategy {
            Strategy::CacheFirst => self.cache_first(partition, request).await,
            Strategy::NetworkFirst => {
                self.network_first(partition, request, None, fallback_on_server_error)
                    .await
            }
            Strategy::NetworkFirstWithOffline => {
                let offline = (worker.static_partition(), worker.offline_key());
                self.network_first(partition, request, Some(offline), fallback_on_server_error)
                    .await
            }
            Strategy::NetworkOnly => Ok(self.network_only(request).await),
        }
    }

    /// Sends `request` to the transport untouched.
    pub async fn passthrough(&self, request: &Request) -> Result<Fetched, FetchError> {
        let response = self
            .transport
            .fetch(request)
            .await
            .map_err(|source| FetchError::Transport {
                key: request.key(),
                source,
            })?;
        Ok(Fetched::new(response, ResponseSource::Network))
    }

    async fn cache_first(
        &self,
        partition: &PartitionName,
        request: &Request,
    ) -> Result<Fetched, FetchError> {
        let key = request.key();
        if request.is_cacheable() {
            if let Some(stored) = self.lookup(partition, &key).await {
                debug!(%partition, %key, "Cache hit, refreshing in background");
                self.spawn_refresh(partition.clone(), request.clone());
                return Ok(Fetched::new(stored.into_response(), ResponseSource::Cache));
            }
        }

        let response = self
            .transport
            .fetch(request)
            .await
            .map_err(|source| FetchError::Transport {
                key: key.clone(),
                source,
            })?;
        self.store_response(partition, request, &response).await;
        Ok(Fetched::new(response, ResponseSource::Network))
    }

    async fn network_first(
        &self,
        partition: &PartitionName,
        request: &Request,
        offline: Option<(&PartitionName, &RequestKey)>,
        fallback_on_server_error: bool,
    ) -> Result<Fetched, FetchError> {
        let key = request.key();
        match self.transport.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_response(partition, request, &response).await;
                } else if fallback_on_server_error
                    && response.is_server_error()
                    && request.is_cacheable()
                {
                    if let Some(stored) = self.lookup(partition, &key).await {
                        debug!(%key, status = %response.status(), "Server error, serving cached entry");
                        return Ok(Fetched::new(stored.into_response(), ResponseSource::Cache));
                    }
                }
                Ok(Fetched::new(response, ResponseSource::Network))
            }
            Err(source) => {
                debug!(%key, error = %source, "Network failed, trying cache");
                if request.is_cacheable() {
                    if let Some(stored) = self.lookup(partition, &key).await {
                        return Ok(Fetched::new(stored.into_response(), ResponseSource::Cache));
                    }
                }
                if let Some((offline_partition, offline_key)) = offline {
                    if let Some(page) = self.lookup(offline_partition, offline_key).await {
                        debug!(%key, "Serving offline page");
                        return Ok(Fetched::new(
                            page.into_response(),
                            ResponseSource::OfflineFallback,
                        ));
                    }
                    warn!(%key, offline = %offline_key, "Offline page is not cached");
                }
                Err(FetchError::Transport { key, source })
            }
        }
    }

    async fn network_only(&self, request: &Request) -> Fetched {
        match self.transport.fetch(request).await {
            Ok(response) => Fetched::new(response, ResponseSource::Network),
            Err(error) => {
                debug!(key = %request.key(), %error, "Stream unreachable");
                Fetched::new(Response::unavailable(), ResponseSource::Synthesized)
            }
        }
    }

    /// Fetches `request` and stores a successful answer in `partition`.
    ///
    /// Returns whether an entry was written. Failures are logged.
    pub async fn fetch_and_store(&self, partition: &PartitionName, request: &Request) -> bool {
        match self.transport.fetch(request).await {
            Ok(response) if response.is_success() => {
                self.store_response(partition, request, &response).await
            }
            Ok(response) => {
                warn!(key = %request.key(), status = %response.status(), "Not caching error response");
                false
            }
            Err(error) => {
                warn!(key = %request.key(), %error, "Failed to fetch for caching");
                false
            }
        }
    }

    async fn lookup(&self, partition: &PartitionName, key: &RequestKey) -> Option<StoredResponse> {
        match self.store.read(partition, key).await {
            Ok(stored) => stored,
            Err(error) => {
                warn!(store = self.store.name(), %partition, %key, %error, "Store read failed");
                None
            }
        }
    }

    async fn store_response(
        &self,
        partition: &PartitionName,
        request: &Request,
        response: &Response,
    ) -> bool {
        write_snapshot(
            self.store.as_ref(),
            self.clock.as_ref(),
            partition,
            request,
            response,
        )
        .await
    }

    fn spawn_refresh(&self, partition: PartitionName, request: Request) {
        let key = OffloadKey::Refresh {
            partition: partition.clone(),
            key: request.key(),
        };
        let store = self.store.clone();
        let transport = self.transport.clone();
        let clock = self.clock.clone();

        self.offload.spawn_with_key(key, async move {
            match transport.fetch(&request).await {
                Ok(response) => {
                    if write_snapshot(store.as_ref(), clock.as_ref(), &partition, &request, &response)
                        .await
                    {
                        debug!(key = %request.key(), "Cache entry refreshed");
                    }
                }
                Err(error) => {
                    debug!(key = %request.key(), %error, "Background refresh failed");
                }
            }
        });
    }
}

/// Writes a successful `GET` response; anything else is skipped.
async fn write_snapshot<S>(
    store: &S,
    clock: &dyn Clock,
    partition: &PartitionName,
    request: &Request,
    response: &Response,
) -> bool
where
    S: Store + ?Sized,
{
    if !request.is_cacheable() || !response.is_success() {
        return false;
    }
    let key = request.key();
    let snapshot = StoredResponse::new(response.clone(), clock.now());
    match store.write(partition, &key, snapshot).await {
        Ok(()) => true,
        Err(error) => {
            warn!(store = store.name(), %partition, %key, %error, "Store write failed");
            false
        }
    }
}
