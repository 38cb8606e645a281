use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use swcache_backend::{DeleteStatus, MemoryStore, PartitionName, Store, StoreError, StoreResult};
use swcache_core::{RequestKey, StoredResponse};
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct StoreCounters {
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub partition_deletes: AtomicUsize,
}

impl StoreCounters {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn partition_deletes(&self) -> usize {
        self.partition_deletes.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        self.partition_deletes.store(0, Ordering::SeqCst);
    }
}

/// Holds one [`Store::partitions`] call of a [`CountingStore`] until opened.
#[derive(Debug, Clone, Default)]
pub struct ListingGate {
    held: Arc<Notify>,
    release: Arc<Notify>,
}

impl ListingGate {
    /// Resolves once a listing is parked at the gate.
    pub async fn held(&self) {
        self.held.notified().await;
    }

    /// Lets the parked listing, or the next one to arrive, through.
    pub fn open(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.held.notify_one();
        self.release.notified().await;
    }
}

/// A [`MemoryStore`] that counts every access and can be told to reject
/// writes or to stall a partition listing.
#[derive(Clone, Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub counters: Arc<StoreCounters>,
    fail_writes: Arc<AtomicBool>,
    listing_gate: Arc<Mutex<Option<ListingGate>>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing store, sharing its partitions.
    pub fn wrap(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.counters.reads()
    }

    pub fn writes(&self) -> usize {
        self.counters.writes()
    }

    /// Accesses of any kind that touch entries.
    pub fn entry_accesses(&self) -> usize {
        self.reads() + self.writes()
    }

    /// Make every following write fail with [`StoreError::ConnectionError`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Parks the next [`Store::partitions`] call until the returned gate is
    /// opened. The listing is taken after the gate opens.
    pub fn hold_next_listing(&self) -> ListingGate {
        let gate = ListingGate::default();
        *self
            .listing_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(gate.clone());
        gate
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::ConnectionError("store is read-only".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn open(&self, partition: &PartitionName) -> StoreResult<()> {
        self.inner.open(partition).await
    }

    async fn read(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<Option<StoredResponse>> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(partition, key).await
    }

    async fn write(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
        value: StoredResponse,
    ) -> StoreResult<()> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.write(partition, key, value).await
    }

    async fn write_all(
        &self,
        partition: &PartitionName,
        entries: Vec<(RequestKey, StoredResponse)>,
    ) -> StoreResult<()> {
        self.counters
            .writes
            .fetch_add(entries.len(), Ordering::SeqCst);
        // Simulates a store that creates the partition before the batch fails.
        self.inner.open(partition).await?;
        self.check_writable()?;
        self.inner.write_all(partition, entries).await
    }

    async fn remove(
        &self,
        partition: &PartitionName,
        key: &RequestKey,
    ) -> StoreResult<DeleteStatus> {
        self.inner.remove(partition, key).await
    }

    async fn partitions(&self) -> StoreResult<Vec<PartitionName>> {
        let gate = self
            .listing_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.inner.partitions().await
    }

    async fn keys(&self, partition: &PartitionName) -> StoreResult<Vec<RequestKey>> {
        self.inner.keys(partition).await
    }

    async fn delete_partition(&self, partition: &PartitionName) -> StoreResult<DeleteStatus> {
        self.counters
            .partition_deletes
            .fetch_add(1, Ordering::SeqCst);
        self.inner.delete_partition(partition).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}
