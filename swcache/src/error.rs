use std::path::PathBuf;

use http::StatusCode;
use http::uri::InvalidUri;
use swcache_backend::StoreError;
use swcache_core::{RequestKey, TransportError};
use thiserror::Error;

/// Error returned from [`CacheManager::fetch`](crate::CacheManager::fetch).
///
/// Only raised when a strategy has nothing left to serve: the network failed
/// and no cached entry or offline page could stand in.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport failed and no fallback was available.
    #[error("{key}: {source}")]
    Transport {
        /// The request that failed.
        key: RequestKey,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },
}

impl FetchError {
    /// The transport failure behind this error.
    pub fn transport(&self) -> &TransportError {
        match self {
            Self::Transport { source, .. } => source,
        }
    }
}

/// Error returned from [`CacheManager::install`](crate::CacheManager::install).
///
/// A failed install leaves the previously active worker untouched.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The worker configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A manifest entry could not be fetched.
    #[error("manifest entry {key} could not be fetched: {source}")]
    Fetch {
        /// The manifest entry.
        key: RequestKey,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// A manifest entry answered with a non-success status.
    #[error("manifest entry {key} answered {status}")]
    Status {
        /// The manifest entry.
        key: RequestKey,
        /// The status received.
        status: StatusCode,
    },

    /// The static partition could not be written.
    #[error("static partition could not be written: {0}")]
    Store(#[source] StoreError),
}

/// Error returned from the control channel.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The message is not valid JSON or is missing a required field.
    #[error("malformed control message: {0}")]
    Parse(#[from] serde_json::Error),

    /// The message needs an active worker and none is installed.
    #[error("no active worker")]
    NoActiveWorker,

    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A URL in the message could not be parsed.
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        /// The URL as received.
        url: String,
        /// Parse failure.
        #[source]
        source: InvalidUri,
    },
}

/// Error raised while loading or validating a [`WorkerConfig`](crate::WorkerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The YAML document could not be deserialized.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_saphyr::Error),

    /// A field holds a value the manager cannot work with.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// A classification pattern does not compile.
    #[error("invalid pattern in `{field}`: {source}")]
    Pattern {
        /// The classification field holding the pattern.
        field: &'static str,
        /// Regex compile failure.
        #[source]
        source: regex::Error,
    },

    /// A manifest or offline page URL could not be parsed.
    #[error("invalid url `{url}`: {source}")]
    Url {
        /// The URL as configured.
        url: String,
        /// Parse failure.
        #[source]
        source: InvalidUri,
    },
}
