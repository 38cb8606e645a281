#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Request classification.
///
/// Every intercepted request is assigned exactly one [`RequestClass`] by a
/// [`Classifier`] built from URL patterns. Classification is pure and total:
/// anything that matches no pattern is a navigation.
pub mod class;

/// Worker configuration and YAML loading.
pub mod config;

/// The control channel between the host page and the manager.
///
/// Tagged JSON messages (`SKIP_WAITING`, `GET_VERSION`, `CACHE_URLS`,
/// `CLEAR_CACHE`) and the replies they produce.
pub mod control;

/// Error types for fetch, install, control and configuration failures.
pub mod error;

/// The fetch-policy executor.
///
/// Runs a [`Policy`](policy::Policy) for one request against the store and
/// the transport and reports where the response came from.
pub mod executor;

/// Worker lifecycle states and the events surfaced to the host page.
pub mod lifecycle;

/// The cache manager: install, activation, fetch dispatch and control.
pub mod manager;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters for
/// responses by class and source, install outcomes, purged partitions and
/// background refresh tasks. Without the feature every recorder is a no-op.
pub mod metrics;

/// Background task offloading for cache refreshes.
///
/// Cache-first responses are served immediately while the entry is refreshed
/// in the background. This module provides the
/// [`OffloadManager`](offload::OffloadManager) running those tasks.
pub mod offload;

/// Fetch strategies and the class-to-strategy table.
pub mod policy;

/// A single installed worker instance.
pub mod worker;

pub use class::{Classifier, RequestClass};
pub use config::WorkerConfig;
pub use control::{CacheUrlsReport, ControlMessage, ControlReply};
pub use error::{ConfigError, ControlError, FetchError, InstallError};
pub use executor::{Fetched, ResponseSource};
pub use lifecycle::{LifecycleEvent, WorkerId, WorkerState};
pub use manager::{CacheManager, CacheManagerBuilder};
pub use policy::{PartitionKind, Policy, Strategy, StrategyMap};

pub use swcache_backend::{DeleteStatus, MemoryStore, PartitionName, Store, StoreError};
pub use swcache_core::{
    Clock, Request, RequestKey, Response, StoredResponse, SystemClock, Transport, TransportError,
};

/// The `swcache` prelude.
///
/// ```rust
/// use swcache::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CacheManager, Fetched, Request, Response, ResponseSource, Store, Transport, WorkerConfig,
    };
}
