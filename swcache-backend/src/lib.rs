//! Traits and structs for swcache store interaction.
//!
//! A store keeps response snapshots in named, independently evictable
//! partitions. If you want to implement your own store, you are in the right
//! place: implement [`Store`] and hand it to the cache manager.
mod error;
mod memory;
mod partition;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use partition::PartitionName;
pub use store::{Store, StoreResult};

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted, with the number of entries removed.
    Deleted(u32),
    /// Record already missing.
    Missing,
}

impl DeleteStatus {
    /// Deleted `entries` entries, saturating at `u32::MAX`.
    pub fn deleted(entries: usize) -> Self {
        Self::Deleted(u32::try_from(entries).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_count_saturates() {
        assert_eq!(DeleteStatus::deleted(3), DeleteStatus::Deleted(3));
        assert_eq!(
            DeleteStatus::deleted(u32::MAX as usize),
            DeleteStatus::Deleted(u32::MAX)
        );
        assert_eq!(
            DeleteStatus::deleted(usize::MAX),
            DeleteStatus::Deleted(u32::MAX)
        );
    }
}
