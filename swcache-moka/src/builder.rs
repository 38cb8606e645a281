//! Builder for configuring [`MokaStore`].

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;
use swcache_backend::PartitionName;

use crate::store::{Capacity, MokaStore};

/// Builder for creating and configuring a [`MokaStore`].
///
/// Use [`MokaStore::builder`] to create a new builder instance.
///
/// Capacity is configured per partition because partitions have different
/// needs: a static partition populated from a manifest must never lose
/// entries, while the dynamic partition grows with live traffic and should be
/// bounded. Partitions without an explicit capacity use the default capacity,
/// which is unbounded unless [`default_capacity`](Self::default_capacity) or
/// [`default_max_bytes`](Self::default_max_bytes) is set. Partitions created
/// by a batch write never take the default.
///
/// # Examples
///
/// ```
/// use swcache_moka::MokaStore;
///
/// let store = MokaStore::builder()
///     .label("radio")
///     .partition_capacity("dynamic", 200)
///     .partition_max_bytes("media-thumbnails", 8 * 1024 * 1024)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct MokaStoreBuilder {
    capacities: HashMap<PartitionName, Capacity>,
    default_capacity: Option<Capacity>,
    label: Option<SmolStr>,
}

impl MokaStoreBuilder {
    /// Creates a builder with no capacity limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom label for this store, shown in logs.
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Bounds a partition to at most `entries` entries.
    pub fn partition_capacity(mut self, partition: impl Into<PartitionName>, entries: u64) -> Self {
        self.capacities
            .insert(partition.into(), Capacity::Entries(entries));
        self
    }

    /// Bounds a partition to approximately `bytes` bytes of stored responses.
    pub fn partition_max_bytes(mut self, partition: impl Into<PartitionName>, bytes: u64) -> Self {
        self.capacities
            .insert(partition.into(), Capacity::Bytes(bytes));
        self
    }

    /// Entry limit for partitions without an explicit capacity.
    ///
    /// Applies to partitions created by single writes. A partition created by
    /// a batch write, such as a static partition populated from a manifest,
    /// stays unbounded unless it has its own capacity.
    pub fn default_capacity(mut self, entries: u64) -> Self {
        self.default_capacity = Some(Capacity::Entries(entries));
        self
    }

    /// Byte limit for partitions without an explicit capacity.
    ///
    /// Like [`default_capacity`](Self::default_capacity), it leaves partitions
    /// created by a batch write unbounded.
    pub fn default_max_bytes(mut self, bytes: u64) -> Self {
        self.default_capacity = Some(Capacity::Bytes(bytes));
        self
    }

    /// Builds the store.
    pub fn build(self) -> MokaStore {
        MokaStore {
            partitions: Arc::new(DashMap::new()),
            capacities: Arc::new(self.capacities),
            default_capacity: self.default_capacity,
            label: self.label.unwrap_or_else(|| SmolStr::new_static("moka")),
        }
    }
}
