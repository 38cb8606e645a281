use std::fmt;

use serde::{Deserialize, Serialize};

use crate::class::RequestClass;

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve the cached entry and refresh it in the background; fetch and
    /// store on a miss.
    CacheFirst,
    /// Fetch and store; fall back to the cached entry on transport failure.
    NetworkFirst,
    /// Like [`Strategy::NetworkFirst`], with the offline page as the last
    /// resort.
    NetworkFirstWithOffline,
    /// Never touch a partition; answer with a synthesized 503 on transport
    /// failure.
    NetworkOnly,
}

impl Strategy {
    /// Stable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::NetworkFirst => "network-first",
            Self::NetworkFirstWithOffline => "network-first-with-offline",
            Self::NetworkOnly => "network-only",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the worker's two partitions a policy reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    /// The version-tagged partition populated at install.
    Static,
    /// The partition filled from live traffic.
    Dynamic,
}

/// Strategy for each request class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyMap {
    /// Strategy for [`RequestClass::StaticAsset`].
    pub static_asset: Strategy,
    /// Strategy for [`RequestClass::Api`].
    pub api: Strategy,
    /// Strategy for [`RequestClass::StreamingMedia`].
    pub streaming_media: Strategy,
    /// Strategy for [`RequestClass::Navigation`].
    pub navigation: Strategy,
}

impl StrategyMap {
    /// Strategy configured for `class`.
    pub fn get(&self, class: RequestClass) -> Strategy {
        match class {
            RequestClass::StaticAsset => self.static_asset,
            RequestClass::Api => self.api,
            RequestClass::StreamingMedia => self.streaming_media,
            RequestClass::Navigation => self.navigation,
        }
    }

    /// Overrides the strategy of `class`.
    pub fn set(&mut self, class: RequestClass, strategy: Strategy) {
        match class {
            RequestClass::StaticAsset => self.static_asset = strategy,
            RequestClass::Api => self.api = strategy,
            RequestClass::StreamingMedia => self.streaming_media = strategy,
            RequestClass::Navigation => self.navigation = strategy,
        }
    }
}

impl Default for StrategyMap {
    fn default() -> Self {
        Self {
            static_asset: Strategy::CacheFirst,
            api: Strategy::NetworkFirst,
            streaming_media: Strategy::NetworkOnly,
            navigation: Strategy::NetworkFirstWithOffline,
        }
    }
}

/// The decision for one request: which strategy, over which partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// How the request is served.
    pub strategy: Strategy,
    /// Partition read and written by the strategy. Ignored by
    /// [`Strategy::NetworkOnly`].
    pub partition: PartitionKind,
}

impl Policy {
    /// Maps a request class to its policy. Pure.
    ///
    /// Static assets live in the static partition; every other class uses the
    /// dynamic partition.
    pub fn for_class(class: RequestClass, strategies: &StrategyMap) -> Self {
        let partition = match class {
            RequestClass::StaticAsset => PartitionKind::Static,
            _ => PartitionKind::Dynamic,
        };
        Self {
            strategy: strategies.get(class),
            partition,
        }
    }
}
