//! Unbounded in-memory store built on `DashMap`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use swcache_core::{RequestKey, StoredResponse};

use crate::{DeleteStatus, PartitionName, Store, StoreResult};

type Partition = DashMap<RequestKey, StoredResponse>;

/// Simple in-memory store.
///
/// Thread-safe and cheap to clone (`Arc` internally); clones share the same
/// partitions. Nothing is evicted until its partition is deleted, which makes
/// it a good fit for tests and for static partitions that must stay complete.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    partitions: Arc<DashMap<PartitionName, Partition>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a partition, `None` if the partition is missing.
    pub fn len(&self, partition: &PartitionName) -> Option<usize> {
        self.partitions.get(partition).map(|entries| entries.len())
    }

    /// Check if a partition exists.
    pub fn has_partition(&self, partition: &PartitionName) -> bool {
        self.partitions.contains_key(partition)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn open(&self, partition: &PartitionName) -> StoreResult<()> {
        self.partitions.entry(partition.clone()).or_default();
        Ok(())
    }

    async fn read(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<Option<StoredResponse>> {
        Ok(self
            .partitions
            .get(partition)
            .and_then(|entries| entries.get(key).map(|value| value.clone())))
    }

    async fn write(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
        value: StoredResponse,
    ) -> StoreResult<()> {
        self.partitions
            .entry(partition.clone())
            .or_default()
            .insert(key.clone(), value);
        Ok(())
    }

    async fn write_all(
        &self,
        partition: &PartitionName,
        entries: Vec<(RequestKey, StoredResponse)>,
    ) -> StoreResult<()> {
        // The partition entry stays locked while the batch lands, so readers
        // observe either none or all of it.
        let target = self.partitions.entry(partition.clone()).or_default();
        for (key, value) in entries {
            target.insert(key, value);
        }
        Ok(())
    }

    async fn remove(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<DeleteStatus> {
        let removed = self
            .partitions
            .get(partition)
            .and_then(|entries| entries.remove(key));
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
            .partitions
            .get(partition)
            .map(|entries| entries.iter().map(|entry| entry.key().clone()).collect())
            .unwrap_or_default())
    }

    async fn delete_partition(&self, partition: &PartitionName) -> StoreResult<DeleteStatus> {
        Ok(match self.partitions.remove(partition) {
            Some((_, entries)) => DeleteStatus::deleted(entries.len()),
            None => DeleteStatus::Missing,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
