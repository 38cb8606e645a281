use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use smol_str::SmolStr;
use swcache_backend::PartitionName;
use swcache_core::RequestKey;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

use super::policy::{OffloadConfig, TimeoutPolicy};
use crate::metrics;

/// Identity of a background task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OffloadKey {
    /// Refresh of one cached entry. Deduplicated.
    Refresh {
        /// Partition holding the entry.
        partition: PartitionName,
        /// The entry being refreshed.
        key: RequestKey,
    },
    /// Any other task, numbered per manager.
    Generated {
        /// Kind of the task, used as the metric label.
        kind: SmolStr,
        /// Sequence number.
        id: u64,
    },
}

impl OffloadKey {
    /// Label used in metrics and spans.
    pub fn kind(&self) -> &str {
        match self {
            Self::Refresh { .. } => "refresh",
            Self::Generated { kind, .. } => kind,
        }
    }
}

impl fmt::Display for OffloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh { partition, key } => write!(f, "refresh {partition}/{key}"),
            Self::Generated { kind, id } => write!(f, "{kind}#{id}"),
        }
    }
}

/// Handle to a spawned task.
#[derive(Debug)]
pub struct OffloadHandle {
    handle: JoinHandle<()>,
}

impl OffloadHandle {
    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
struct Shared {
    config: OffloadConfig,
    tasks: DashMap<OffloadKey, OffloadHandle>,
    sequence: AtomicU64,
}

/// Runs background tasks on the tokio runtime and tracks them by key.
///
/// Cheap to clone; clones share the same task table.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    shared: Arc<Shared>,
}

impl OffloadManager {
    /// Create a manager with the given configuration.
    pub fn new(config: OffloadConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                tasks: DashMap::new(),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &OffloadConfig {
        &self.shared.config
    }

    /// Spawn a task under a fresh [`OffloadKey::Generated`] key.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> Option<OffloadKey>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = OffloadKey::Generated {
            kind: kind.into(),
            id: self.shared.sequence.fetch_add(1, Ordering::Relaxed),
        };
        self.spawn_with_key(key.clone(), task).then_some(key)
    }

    /// Spawn a task under `key`.
    ///
    /// Returns `false` when the task was skipped: a refresh with the same key
    /// is still running and deduplication is on, or the concurrency bound is
    /// reached.
    pub fn spawn_with_key<F>(&self, key: OffloadKey, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = &self.shared.config;
        if config.deduplicate
            && matches!(key, OffloadKey::Refresh { .. })
            && self.is_in_flight(&key)
        {
            debug!(%key, "Refresh already in flight");
            metrics::offload_deduplicated(key.kind());
            return false;
        }
        if let Some(max) = config.max_concurrent_tasks {
            if self.active_task_count() >= max {
                debug!(%key, max, "Offload capacity reached, task skipped");
                metrics::offload_rejected(key.kind());
                return false;
            }
        }

        self.shared.tasks.retain(|_, handle| !handle.is_finished());
        metrics::offload_spawned(key.kind());
        let handle = self.run(key.clone(), task);
        self.shared.tasks.insert(key, handle);
        true
    }

    /// Number of tasks still running.
    pub fn active_task_count(&self) -> usize {
        self.shared
            .tasks
            .iter()
            .filter(|entry| !entry.is_finished())
            .count()
    }

    /// Whether a task with `key` is still running.
    pub fn is_in_flight(&self, key: &OffloadKey) -> bool {
        self.shared
            .tasks
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort every running task.
    pub fn cancel_all(&self) {
        for entry in self.shared.tasks.iter() {
            entry.abort();
        }
    }

    /// Wait until every tracked task has finished.
    pub async fn wait_all(&self) {
        loop {
            self.shared.tasks.retain(|_, handle| !handle.is_finished());
            if self.shared.tasks.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Like [`wait_all`](Self::wait_all), bounded by `timeout`. Returns
    /// `false` if tasks were still running when it elapsed.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn run<F>(&self, key: OffloadKey, task: F) -> OffloadHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let span = info_span!("offload_task", kind = key.kind(), key = %key);
        let policy = self.shared.config.timeout_policy;

        let handle = tokio::spawn(
            async move {
                let start = Instant::now();
                let kind = key.kind().to_owned();
                match policy {
                    TimeoutPolicy::None => task.await,
                    TimeoutPolicy::Cancel(limit) => {
                        if tokio::time::timeout(limit, task).await.is_err() {
                            warn!(%key, limit_ms = limit.as_millis(), "Offload task cancelled after timeout");
                            metrics::offload_timed_out(&kind, start.elapsed());
                            return;
                        }
                    }
                    TimeoutPolicy::Warn(limit) => {
                        task.await;
                        let elapsed = start.elapsed();
                        if elapsed > limit {
                            warn!(
                                %key,
                                elapsed_ms = elapsed.as_millis(),
                                limit_ms = limit.as_millis(),
                                "Offload task exceeded its time limit"
                            );
                        }
                    }
                }
                metrics::offload_completed(&kind, start.elapsed());
            }
            .instrument(span),
        );

        OffloadHandle { handle }
    }
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::new(OffloadConfig::default())
    }
}
