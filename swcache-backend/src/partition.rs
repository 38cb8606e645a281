use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Name of a cache partition, such as `v2-static` or `dynamic`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionName(SmolStr);

impl PartitionName {
    /// Creates a partition name.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartitionName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PartitionName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for PartitionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PartitionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
