use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use futures::future::join_all;
use swcache_backend::{DeleteStatus, PartitionName, Store, StoreError};
use swcache_core::{Clock, Request, StoredResponse, SystemClock, Transport};
use tokio::sync::{RwLock, broadcast};
use tracing::{Instrument, debug, debug_span, info, info_span, warn};

use crate::config::WorkerConfig;
use crate::control::{CacheUrlsReport, ControlMessage, ControlReply};
use crate::error::{ControlError, FetchError, InstallError};
use crate::executor::{Executor, Fetched};
use crate::lifecycle::{LifecycleEvent, WorkerId, WorkerState};
use crate::metrics;
use crate::offload::{OffloadConfig, OffloadManager};
use crate::worker::Worker;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Default)]
struct Registration {
    waiting: Option<Arc<Worker>>,
    active: Option<Arc<Worker>>,
    clients: usize,
}

/// The offline cache manager.
///
/// Owns the worker lifecycle (install, wait, activate) and serves every
/// intercepted request with the active worker's policies.
///
/// ```
/// use swcache::{CacheManager, MemoryStore, Request, ResponseSource, WorkerConfig};
/// use swcache_test::FakeTransport;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = FakeTransport::new()
///     .respond("/", "<h1>home</h1>")
///     .respond("/offline.html", "offline");
/// let manager = CacheManager::new(MemoryStore::new(), transport.clone());
///
/// let config = WorkerConfig::builder("v1")
///     .manifest(["/", "/offline.html"])
///     .build();
/// manager.install(config).await.unwrap();
///
/// transport.set_offline(true);
/// let fetched = manager.fetch(&Request::try_get("/schedule").unwrap()).await.unwrap();
/// assert_eq!(fetched.source, ResponseSource::OfflineFallback);
/// # }
/// ```
pub struct CacheManager<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    clock: Arc<dyn Clock>,
    executor: Executor<S, T>,
    registration: RwLock<Registration>,
    states: DashMap<WorkerId, WorkerState>,
    /// Static partitions committed by installs that have not registered yet.
    installing: DashMap<PartitionName, usize>,
    next_id: AtomicU64,
    events: broadcast::Sender<LifecycleEvent>,
}

impl<S, T> CacheManager<S, T>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    /// Manager with the system clock and default offload settings.
    pub fn new(store: S, transport: T) -> Self {
        Self::builder(store, transport).build()
    }

    /// Creates a builder.
    pub fn builder(store: S, transport: T) -> CacheManagerBuilder<S, T> {
        CacheManagerBuilder::new(store, transport)
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The manager running background refreshes.
    pub fn offload(&self) -> &OffloadManager {
        self.executor.offload()
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Current state of a worker, if it was ever installed.
    pub fn state(&self, worker: WorkerId) -> Option<WorkerState> {
        self.states.get(&worker).map(|state| *state)
    }

    /// The worker serving fetches.
    pub async fn active_worker(&self) -> Option<Arc<Worker>> {
        self.registration.read().await.active.clone()
    }

    /// The installed worker waiting for activation.
    pub async fn waiting_worker(&self) -> Option<Arc<Worker>> {
        self.registration.read().await.waiting.clone()
    }

    /// Version tag of the active worker.
    pub async fn version(&self) -> Option<String> {
        self.active_worker()
            .await
            .map(|worker| worker.version().to_owned())
    }

    /// Installs a worker version.
    ///
    /// Every manifest entry is fetched before anything is written; a single
    /// failure fails the whole install and leaves the store untouched. The
    /// new worker then activates right away if nothing is active, no client
    /// is connected or the config asks to skip waiting. Otherwise it waits
    /// and [`LifecycleEvent::UpdateAvailable`] is emitted.
    pub async fn install(&self, config: WorkerConfig) -> Result<WorkerId, InstallError> {
        let id = WorkerId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let span = info_span!("swcache.install", worker = %id, version = %config.version);
        self.install_worker(id, config).instrument(span).await
    }

    async fn install_worker(
        &self,
        id: WorkerId,
        config: WorkerConfig,
    ) -> Result<WorkerId, InstallError> {
        let version = config.version.clone();
        self.states.insert(id, WorkerState::Installing);

        let worker = match Worker::new(id, config) {
            Ok(worker) => Arc::new(worker),
            Err(error) => return Err(self.fail_install(id, version, error.into())),
        };
        let partition = worker.static_partition().clone();
        self.reserve(&partition);
        if let Err(error) = self.populate_static(&worker).await {
            self.release(&partition);
            return Err(self.fail_install(id, version, error));
        }
        metrics::record_install(true);

        let mut registration = self.registration.write().await;
        self.set_state(id, WorkerState::Waiting);
        if let Some(previous) = registration.waiting.replace(worker.clone()) {
            info!(superseded = %previous.id(), "Waiting worker superseded");
            self.set_state(previous.id(), WorkerState::Redundant);
        }
        self.release(&partition);

        if registration.active.is_none()
            || registration.clients == 0
            || worker.config().skip_waiting_on_install
        {
            self.activate_waiting(&mut registration).await;
        } else {
            info!(clients = registration.clients, "Installed, waiting for activation");
            self.emit(LifecycleEvent::UpdateAvailable {
                worker: id,
                version,
            });
        }
        Ok(id)
    }

    fn fail_install(&self, id: WorkerId, version: String, error: InstallError) -> InstallError {
        warn!(%error, "Install failed");
        self.set_state(id, WorkerState::Redundant);
        metrics::record_install(false);
        self.emit(LifecycleEvent::InstallFailed {
            worker: id,
            version,
        });
        error
    }

    /// Shields a static partition from activation purges until its install
    /// either fails or registers as waiting.
    fn reserve(&self, partition: &PartitionName) {
        *self.installing.entry(partition.clone()).or_insert(0) += 1;
    }

    fn release(&self, partition: &PartitionName) {
        self.installing.remove_if_mut(partition, |_, installs| {
            *installs -= 1;
            *installs == 0
        });
    }

    async fn populate_static(&self, worker: &Worker) -> Result<(), InstallError> {
        let partition = worker.static_partition();
        let fetches = worker.manifest().iter().map(|request| async move {
            let key = request.key();
            let response = match self.transport.fetch(request).await {
                Ok(response) => response,
                Err(source) => return Err(InstallError::Fetch { key, source }),
            };
            if !response.is_success() {
                return Err(InstallError::Status {
                    key,
                    status: response.status(),
                });
            }
            Ok((key, StoredResponse::new(response, self.clock.now())))
        });
        let entries = join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let existed = match self.store.partitions().await {
            Ok(partitions) => partitions.contains(partition),
            Err(error) => {
                warn!(%error, "Could not list partitions before commit");
                true
            }
        };
        debug!(%partition, entries = entries.len(), "Committing static partition");
        if let Err(error) = self.store.write_all(partition, entries).await {
            if !existed {
                if let Err(cleanup) = self.store.delete_partition(partition).await {
                    warn!(%partition, error = %cleanup, "Failed to drop partially written partition");
                }
            }
            return Err(InstallError::Store(error));
        }
        Ok(())
    }

    /// Activates the waiting worker, if any.
    ///
    /// A second call with nothing waiting is a no-op and returns `None`.
    pub async fn skip_waiting(&self) -> Option<WorkerId> {
        let mut registration = self.registration.write().await;
        if registration.waiting.is_none() {
            debug!("Nothing waiting, skip-waiting ignored");
            return None;
        }
        self.activate_waiting(&mut registration).await
    }

    /// Registers a client controlled by the manager.
    pub async fn client_connected(&self) {
        self.registration.write().await.clients += 1;
    }

    /// Unregisters a client. When the last one leaves, the waiting worker
    /// takes over; its id is returned.
    pub async fn client_disconnected(&self) -> Option<WorkerId> {
        let mut registration = self.registration.write().await;
        registration.clients = registration.clients.saturating_sub(1);
        if registration.clients == 0 && registration.waiting.is_some() {
            return self.activate_waiting(&mut registration).await;
        }
        None
    }

    async fn activate_waiting(&self, registration: &mut Registration) -> Option<WorkerId> {
        let worker = registration.waiting.take()?;
        let span = info_span!("swcache.activate", worker = %worker.id(), version = %worker.version());
        async {
            self.purge_partitions(&worker).await;
            if let Some(previous) = registration.active.replace(worker.clone()) {
                self.set_state(previous.id(), WorkerState::Redundant);
            }
            self.set_state(worker.id(), WorkerState::Active);
            info!("Worker activated");
            self.emit(LifecycleEvent::Activated {
                worker: worker.id(),
                version: worker.version().to_owned(),
            });
        }
        .instrument(span)
        .await;
        Some(worker.id())
    }

    async fn purge_partitions(&self, worker: &Worker) {
        let partitions = match self.store.partitions().await {
            Ok(partitions) => partitions,
            Err(error) => {
                warn!(%error, "Could not list partitions, nothing purged");
                return;
            }
        };

        let mut purged = 0;
        let purgeable = partitions
            .iter()
            .filter(|partition| !worker.keeps(partition))
            .filter(|partition| {
                let installing = self.installing.contains_key(*partition);
                if installing {
                    debug!(%partition, "Partition belongs to a pending install, kept");
                }
                !installing
            });
        for partition in purgeable {
            match self.store.delete_partition(partition).await {
                Ok(DeleteStatus::Deleted(entries)) => {
                    info!(%partition, entries, "Partition purged");
                    purged += 1;
                }
                Ok(DeleteStatus::Missing) => {}
                Err(error) => warn!(%partition, %error, "Failed to purge partition"),
            }
        }
        metrics::record_partitions_purged(purged);
    }

    /// Serves an intercepted request.
    ///
    /// Requests with a non-http scheme, and every request while no worker is
    /// active, go straight to the transport.
    pub async fn fetch(&self, request: &Request) -> Result<Fetched, FetchError> {
        if !request.is_interceptable() {
            debug!(uri = %request.uri(), "Scheme not intercepted");
            return self.executor.passthrough(request).await;
        }
        let Some(worker) = self.active_worker().await else {
            debug!(key = %request.key(), "No active worker, passing through");
            return self.executor.passthrough(request).await;
        };

        let class = worker.classify(request);
        let policy = worker.policy_for(class);
        let span = debug_span!(
            "swcache.fetch",
            key = %request.key(),
            class = class.as_str(),
            strategy = policy.strategy.as_str(),
            source = tracing::field::Empty,
        );
        let start = Instant::now();
        let result = self
            .executor
            .execute(&worker, policy, request)
            .instrument(span.clone())
            .await;
        if let Ok(fetched) = &result {
            span.record("source", fetched.source.as_str());
            metrics::record_response(class, fetched.source, start.elapsed());
        }
        result
    }

    /// Fetches `urls` into the active worker's dynamic partition.
    ///
    /// All URLs must parse. Each one is then fetched and stored on its own;
    /// a failure is reported and does not affect the others.
    pub async fn cache_urls(&self, urls: &[String]) -> Result<CacheUrlsReport, ControlError> {
        let worker = self
            .active_worker()
            .await
            .ok_or(ControlError::NoActiveWorker)?;
        let requests = urls
            .iter()
            .map(|url| {
                Request::try_get(url).map_err(|source| ControlError::InvalidUrl {
                    url: url.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let partition = worker.dynamic_partition();
        let outcomes = join_all(
            requests
                .iter()
                .map(|request| self.executor.fetch_and_store(partition, request)),
        )
        .await;

        let mut report = CacheUrlsReport::default();
        for (url, stored) in urls.iter().zip(outcomes) {
            if stored {
                report.stored.push(url.clone());
            } else {
                report.failed.push(url.clone());
            }
        }
        debug!(stored = report.stored.len(), failed = report.failed.len(), "URLs cached");
        Ok(report)
    }

    /// Deletes a partition by name.
    pub async fn evict_partition(
        &self,
        partition: &PartitionName,
    ) -> Result<DeleteStatus, StoreError> {
        let status = self.store.delete_partition(partition).await?;
        info!(%partition, ?status, "Partition evicted");
        Ok(status)
    }

    /// Handles a control message.
    pub async fn handle_message(
        &self,
        message: ControlMessage,
    ) -> Result<Option<ControlReply>, ControlError> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting().await;
                Ok(None)
            }
            ControlMessage::GetVersion => {
                let version = self.version().await.ok_or(ControlError::NoActiveWorker)?;
                Ok(Some(ControlReply::Version { version }))
            }
            ControlMessage::CacheUrls { urls } => {
                self.cache_urls(&urls).await?;
                Ok(None)
            }
            ControlMessage::ClearCache { cache_name } => {
                self.evict_partition(&PartitionName::from(cache_name)).await?;
                Ok(None)
            }
            ControlMessage::Unknown => {
                warn!("Unknown control message ignored");
                Ok(None)
            }
        }
    }

    /// Handles a JSON control message and serializes the reply, if any.
    pub async fn handle_json(&self, json: &str) -> Result<Option<String>, ControlError> {
        let message = ControlMessage::from_json(json)?;
        match self.handle_message(message).await? {
            Some(reply) => Ok(Some(reply.to_json()?)),
            None => Ok(None),
        }
    }

    fn set_state(&self, worker: WorkerId, next: WorkerState) {
        let mut state = self.states.entry(worker).or_insert(next);
        if *state == next {
            return;
        }
        if state.can_transition_to(next) {
            debug!(%worker, from = %*state, to = %next, "Worker state changed");
            *state = next;
        } else {
            warn!(%worker, from = %*state, to = %next, "Ignoring invalid state transition");
        }
    }

    fn emit(&self, event: LifecycleEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

/// Builder for [`CacheManager`].
pub struct CacheManagerBuilder<S, T> {
    store: S,
    transport: T,
    clock: Option<Arc<dyn Clock>>,
    offload: OffloadConfig,
    event_capacity: usize,
}

impl<S, T> CacheManagerBuilder<S, T>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    /// Create a new builder with default values.
    pub fn new(store: S, transport: T) -> Self {
        Self {
            store,
            transport,
            clock: None,
            offload: OffloadConfig::default(),
            event_capacity: EVENT_CAPACITY,
        }
    }

    /// Clock used to stamp stored responses.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Settings of the background refresh manager.
    pub fn offload_config(mut self, config: OffloadConfig) -> Self {
        self.offload = config;
        self
    }

    /// Number of lifecycle events buffered per subscriber.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Build the manager. Nothing is active until the first install.
    pub fn build(self) -> CacheManager<S, T> {
        let store = Arc::new(self.store);
        let transport = Arc::new(self.transport);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let executor = Executor::new(
            store.clone(),
            transport.clone(),
            clock.clone(),
            OffloadManager::new(self.offload),
        );
        let (events, _) = broadcast::channel(self.event_capacity);
        CacheManager {
            store,
            transport,
            clock,
            executor,
            registration: RwLock::new(Registration::default()),
            states: DashMap::new(),
            installing: DashMap::new(),
            next_id: AtomicU64::new(0),
            events,
        }
    }
}
