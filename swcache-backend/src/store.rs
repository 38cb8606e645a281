use std::sync::Arc;

use async_trait::async_trait;
use swcache_core::{RequestKey, StoredResponse};

use crate::{DeleteStatus, PartitionName, StoreError};

pub type StoreResult<T> = Result<T, StoreError>;

/// A durable keyed store of response snapshots, split into named partitions.
///
/// Reads may run concurrently with writes. Concurrent writes to the same
/// identity are last-writer-wins replacements, so implementations need no
/// coordination beyond what their map type already gives them.
///
/// Reading from a partition that does not exist is a miss, not an error.
/// Writing to a partition that does not exist creates it.
#[async_trait]
pub trait Store: Sync + Send {
    /// Creates the partition if it does not exist yet.
    async fn open(&self, partition: &PartitionName) -> StoreResult<()>;

    async fn read(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<Option<StoredResponse>>;

    async fn write(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
        value: StoredResponse,
    ) -> StoreResult<()>;

    /// Writes a batch of entries into one partition.
    ///
    /// The default implementation writes entries one by one; stores that can
    /// publish a batch at once should override it.
    async fn write_all(
        &self,
        partition: &PartitionName,
        entries: Vec<(RequestKey, StoredResponse)>,
    ) -> StoreResult<()> {
        self.open(partition).await?;
        for (key, value) in entries {
            self.write(partition, &key, value).await?;
        }
        Ok(())
    }

    async fn remove(&self, partition: &PartitionName, key: &RequestKey)
    -> StoreResult<DeleteStatus>;

    /// Names of all existing partitions, sorted.
    async fn partitions(&self) -> StoreResult<Vec<PartitionName>>;

    /// Identities stored in a partition. Empty for a missing partition.
    async fn keys(&self, partition: &PartitionName) -> StoreResult<Vec<RequestKey>>;

    /// Deletes a partition with all of its entries.
    async fn delete_partition(&self, partition: &PartitionName) -> StoreResult<DeleteStatus>;

    /// Returns the name of this store, used in logs.
    fn name(&self) -> &str {
        "store"
    }
}

#[async_trait]
impl Store for Box<dyn Store> {
    async fn open(&self, partition: &PartitionName) -> StoreResult<()> {
        (**self).open(partition).await
    }

    async fn read(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<Option<StoredResponse>> {
        (**self).read(partition, key).await
    }

    async fn write(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
        value: StoredResponse,
    ) -> StoreResult<()> {
        (**self).write(partition, key, value).await
    }

    async fn write_all(
        &self,
        partition: &PartitionName,
        entries: Vec<(RequestKey, StoredResponse)>,
    ) -> StoreResult<()> {
        (**self).write_all(partition, entries).await
    }

    async fn remove(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<DeleteStatus> {
        (**self).remove(partition, key).await
    }

    async fn partitions(&self) -> StoreResult<Vec<PartitionName>> {
        (**self).partitions().await
    }

    async fn keys(&self, partition: &PartitionName) -> StoreResult<Vec<RequestKey>> {
        (**self).keys(partition).await
    }

    async fn delete_partition(&self, partition: &PartitionName) -> StoreResult<DeleteStatus> {
        (**self).delete_partition(partition).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl Store for Arc<dyn Store + Send + 'static> {
    async fn open(&self, partition: &PartitionName) -> StoreResult<()> {
        (**self).open(partition).await
    }

    async fn read(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<Option<StoredResponse>> {
        (**self).read(partition, key).await
    }

    async fn write(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
        value: StoredResponse,
    ) -> StoreResult<()> {
        (**self).write(partition, key, value).await
    }

    async fn write_all(
        &self,
        partition: &PartitionName,
        entries: Vec<(RequestKey, StoredResponse)>,
    ) -> StoreResult<()> {
        (**self).write_all(partition, entries).await
    }

    async fn remove(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<DeleteStatus> {
        (**self).remove(partition, key).await
    }

    async fn partitions(&self) -> StoreResult<Vec<PartitionName>> {
        (**self).partitions().await
    }

    async fn keys(&self, partition: &PartitionName) -> StoreResult<Vec<RequestKey>> {
        (**self).keys(partition).await
    }

    async fn delete_partition(&self, partition: &PartitionName) -> StoreResult<DeleteStatus> {
        (**self).delete_partition(partition).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
