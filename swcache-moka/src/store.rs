//! Moka store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use smol_str::SmolStr;
use swcache_backend::{DeleteStatus, PartitionName, Store, StoreResult};
use swcache_core::{RequestKey, StoredResponse};
use tracing::debug;

use crate::builder::MokaStoreBuilder;

/// Size limit of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Capacity {
    /// At most this many entries.
    Entries(u64),
    /// At most this many bytes, weighed with [`StoredResponse::memory_size`].
    Bytes(u64),
}

/// In-memory store powered by Moka, one Moka cache per partition.
///
/// When a bounded partition is full, Moka's admission and eviction policy
/// decides which entries stay. Eviction is best-effort and happens in Moka's
/// maintenance tasks, so a partition may briefly exceed its bound.
///
/// # Caveats
///
/// - Data is **not persisted**; partitions are lost on process restart.
/// - [`Store::write_all`] writes entries one by one. Readers may observe a
///   partially written batch while it lands.
/// - A partition first created by [`Store::write_all`] ignores the default
///   capacity, so a manifest batch is never evicted.
#[derive(Clone)]
pub struct MokaStore {
    pub(crate) partitions: Arc<DashMap<PartitionName, Cache<RequestKey, StoredResponse>>>,
    pub(crate) capacities: Arc<HashMap<PartitionName, Capacity>>,
    pub(crate) default_capacity: Option<Capacity>,
    pub(crate) label: SmolStr,
}

impl std::fmt::Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("label", &self.label)
            .field("partitions", &self.partitions.len())
            .field("capacities", &self.capacities)
            .field("default_capacity", &self.default_capacity)
            .finish()
    }
}

impl MokaStore {
    /// Creates a new builder for `MokaStore`.
    pub fn builder() -> MokaStoreBuilder {
        MokaStoreBuilder::new()
    }

    /// Runs Moka's pending maintenance tasks on every partition.
    ///
    /// Eviction normally happens lazily; call this when an exact view of the
    /// partitions is needed.
    pub async fn run_pending_tasks(&self) {
        let caches: Vec<_> = self
            .partitions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for cache in caches {
            cache.run_pending_tasks().await;
        }
    }

    /// Approximate number of entries in a partition.
    pub fn entry_count(&self, partition: &PartitionName) -> Option<u64> {
        self.partitions
            .get(partition)
            .map(|cache| cache.entry_count())
    }

    fn existing(&self, partition: &PartitionName) -> Option<Cache<RequestKey, StoredResponse>> {
        self.partitions
            .get(partition)
            .map(|cache| cache.value().clone())
    }

    fn open_cache(&self, partition: &PartitionName) -> Cache<RequestKey, StoredResponse> {
        self.open_with_fallback(partition, self.default_capacity)
    }

    fn open_with_fallback(
        &self,
        partition: &PartitionName,
        fallback: Option<Capacity>,
    ) -> Cache<RequestKey, StoredResponse> {
        self.partitions
            .entry(partition.clone())
            .or_insert_with(|| {
                let capacity = self.capacities.get(partition).copied().or(fallback);
                debug!(store = %self.label, %partition, ?capacity, "creating partition");
                build_cache(capacity)
            })
            .value()
            .clone()
    }
}

fn build_cache(capacity: Option<Capacity>) -> Cache<RequestKey, StoredResponse> {
    let builder = Cache::<RequestKey, StoredResponse>::builder();
    match capacity {
        None => builder.build(),
        Some(Capacity::Entries(entries)) => builder.max_capacity(entries).build(),
        Some(Capacity::Bytes(bytes)) => builder.max_capacity(bytes).weigher(weigh).build(),
    }
}

fn weigh(key: &RequestKey, value: &StoredResponse) -> u32 {
    (key.url().len() + value.memory_size())
        .try_into()
        .unwrap_or(u32::MAX)
}

#[async_trait]
impl Store for MokaStore {
    async fn open(&self, partition: &PartitionName) -> StoreResult<()> {
        self.open_cache(partition);
        Ok(())
    }

    async fn read(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<Option<StoredResponse>> {
        match self.existing(partition) {
            Some(cache) => Ok(cache.get(key).await),
            None => Ok(None),
        }
    }

    async fn write(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
        value: StoredResponse,
    ) -> StoreResult<()> {
        self.open_cache(partition).insert(key.clone(), value).await;
        Ok(())
    }

    /// A partition created by a batch write is bounded only by an explicit
    /// per-partition capacity, never by the default one.
    async fn write_all(
        &self,
        partition: &PartitionName,
        entries: Vec<(RequestKey, StoredResponse)>,
    ) -> StoreResult<()> {
        let cache = self.open_with_fallback(partition, None);
        for (key, value) in entries {
            cache.insert(key, value).await;
        }
        Ok(())
    }

    async fn remove(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<DeleteStatus> {
        let removed = match self.existing(partition) {
            Some(cache) => cache.remove(key).await,
            None => None,
        };
        Ok(match removed {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    async fn partitions(&self) -> StoreResult<Vec<PartitionName>> {
        let mut names: Vec<_> = self
            .partitions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn keys(&self, partition: &PartitionName) -> StoreResult<Vec<RequestKey>> {
        Ok(self
            .existing(partition)
            .map(|cache| cache.iter().map(|(key, _)| (*key).clone()).collect())
            .unwrap_or_default())
    }

    async fn delete_partition(&self, partition: &PartitionName) -> StoreResult<DeleteStatus> {
        match self.partitions.remove(partition) {
            Some((_, cache)) => {
                let removed = cache.iter().count();
                cache.invalidate_all();
                cache.run_pending_tasks().await;
                Ok(DeleteStatus::deleted(removed))
            }
            None => Ok(DeleteStatus::Missing),
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}
