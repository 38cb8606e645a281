//! Worker configuration.
//!
//! A [`WorkerConfig`] describes one deployable worker version: its version
//! tag, the manifest populated at install, the offline page and the fetch
//! policy knobs. Configs are usually loaded from YAML:
//!
//! ```yaml
//! version: v2
//! dynamic_partition: dynamic
//! offline_page: /offline.html
//! manifest:
//!   - /
//!   - /index.html
//!   - /css/styles.css
//!   - /offline.html
//! strategies:
//!   navigation: network-first-with-offline
//! network_first:
//!   fallback_on_server_error: false
//! ```
//!
//! Every field except `version` has a default. The version tag names the
//! static partition (`{version}-static`), so bumping it on deploy is what
//! makes the next activation purge the previous static partition.

use std::path::Path;

use http::Uri;
use serde::{Deserialize, Serialize};
use swcache_backend::PartitionName;

use crate::class::RequestClass;
use crate::error::ConfigError;
use crate::policy::{Strategy, StrategyMap};

const STATIC_SUFFIX: &str = "-static";

fn default_dynamic_partition() -> String {
    "dynamic".to_owned()
}

fn default_offline_page() -> String {
    "/offline.html".to_owned()
}

/// Configuration of a worker version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Version tag bumped by the deployer.
    pub version: String,
    /// Name of the partition filled from live traffic.
    #[serde(default = "default_dynamic_partition")]
    pub dynamic_partition: String,
    /// URLs fetched into the static partition at install, in order.
    #[serde(default)]
    pub manifest: Vec<String>,
    /// Page served to navigations when both network and cache miss.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,
    /// Activate as soon as install finishes, even with clients attached.
    #[serde(default)]
    pub skip_waiting_on_install: bool,
    /// URL patterns used to classify requests.
    #[serde(default)]
    pub classification: ClassificationConfig,
    /// Strategy used for each request class.
    #[serde(default)]
    pub strategies: StrategyMap,
    /// Network-first tuning.
    #[serde(default)]
    pub network_first: NetworkFirstConfig,
}

impl WorkerConfig {
    /// Creates a builder for the given version tag.
    pub fn builder(version: impl Into<String>) -> WorkerConfigBuilder {
        WorkerConfigBuilder::new(version)
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_saphyr::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Name of the static partition owned by this version.
    pub fn static_partition(&self) -> PartitionName {
        PartitionName::from(format!("{}{STATIC_SUFFIX}", self.version))
    }

    /// Name of the dynamic partition.
    pub fn dynamic_partition(&self) -> PartitionName {
        PartitionName::from(self.dynamic_partition.as_str())
    }

    /// Checks invariants that serde cannot express.
    ///
    /// Regex patterns are checked when the classifier is compiled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid("version tag must not be empty".to_owned()));
        }
        if self.dynamic_partition.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "dynamic partition name must not be empty".to_owned(),
            ));
        }
        if self.dynamic_partition() == self.static_partition() {
            return Err(ConfigError::Invalid(format!(
                "dynamic partition `{}` collides with the static partition",
                self.dynamic_partition
            )));
        }
        for url in self.manifest.iter().chain(std::iter::once(&self.offline_page)) {
            url.parse::<Uri>().map_err(|source| ConfigError::Url {
                url: url.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// URL patterns for [`Classifier`](crate::Classifier).
///
/// Path patterns are matched against the URL path only; URL patterns against
/// the whole URL as given by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Path pattern of static assets.
    pub static_asset_path: String,
    /// URL pattern of API calls.
    pub api_url: String,
    /// Path pattern of media files.
    pub streaming_path: String,
    /// URL pattern of live streams.
    pub streaming_url: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            static_asset_path: r"\.(css|js|png|jpg|jpeg|gif|svg|woff|woff2|ttf|eot|ico)$".to_owned(),
            api_url: "/api/".to_owned(),
            streaming_path: r"\.(mp3|aac|ogg|m4a|flac|wav)$".to_owned(),
            streaming_url: "stream|radio".to_owned(),
        }
    }
}

/// Network-first tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkFirstConfig {
    /// Also fall back to a cached entry when the network answers with a 5xx.
    ///
    /// Off by default: only transport failures fall back, and error statuses
    /// reach the caller unmodified.
    pub fallback_on_server_error: bool,
}

/// Builder for [`WorkerConfig`].
#[derive(Debug, Clone)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Create a new builder with default values.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            config: WorkerConfig {
                version: version.into(),
                dynamic_partition: default_dynamic_partition(),
                manifest: Vec::new(),
                offline_page: default_offline_page(),
                skip_waiting_on_install: false,
                classification: ClassificationConfig::default(),
                strategies: StrategyMap::default(),
                network_first: NetworkFirstConfig::default(),
            },
        }
    }

    /// Set the manifest.
    pub fn manifest<I, U>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.config.manifest = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Set the dynamic partition name.
    pub fn dynamic_partition(mut self, name: impl Into<String>) -> Self {
        self.config.dynamic_partition = name.into();
        self
    }

    /// Set the offline page URL.
    pub fn offline_page(mut self, url: impl Into<String>) -> Self {
        self.config.offline_page = url.into();
        self
    }

    /// Activate right after install.
    pub fn skip_waiting_on_install(mut self, enabled: bool) -> Self {
        self.config.skip_waiting_on_install = enabled;
        self
    }

    /// Set the classification patterns.
    pub fn classification(mut self, classification: ClassificationConfig) -> Self {
        self.config.classification = classification;
        self
    }

    /// Use `strategy` for requests of `class`.
    pub fn strategy(mut self, class: RequestClass, strategy: Strategy) -> Self {
        self.config.strategies.set(class, strategy);
        self
    }

    /// Fall back to cache on 5xx network responses.
    pub fn fallback_on_server_error(mut self, enabled: bool) -> Self {
        self.config.network_first.fallback_on_server_error = enabled;
        self
    }

    /// Build the config. Validation happens at install.
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let config = WorkerConfig::from_yaml_str("version: v1\n").unwrap();
        assert_eq!(config, WorkerConfig::builder("v1").build());
        assert_eq!(config.static_partition(), PartitionName::from("v1-static"));
        assert_eq!(config.dynamic_partition(), PartitionName::from("dynamic"));
    }

    #[test]
    fn full_yaml() {
        let yaml = r#"
version: v2
dynamic_partition: radio-dynamic
offline_page: /offline.html
skip_waiting_on_install: true
manifest:
  - /
  - /css/styles.css
  - /offline.html
strategies:
  api: cache-first
network_first:
  fallback_on_server_error: true
"#;
        let config = WorkerConfig::from_yaml_str(yaml).unwrap();
        let expected = WorkerConfig::builder("v2")
            .dynamic_partition("radio-dynamic")
            .skip_waiting_on_install(true)
            .manifest(["/", "/css/styles.css", "/offline.html"])
            .strategy(RequestClass::Api, Strategy::CacheFirst)
            .fallback_on_server_error(true)
            .build();
        assert_eq!(config, expected);
    }

    #[test]
    fn empty_version_is_rejected() {
        let error = WorkerConfig::from_yaml_str("version: ''\n").unwrap_err();
        assert!(matches!(error, ConfigError::Invalid(_)));
    }

    #[test]
    fn dynamic_partition_must_not_shadow_static() {
        let config = WorkerConfig::builder("v1")
            .dynamic_partition("v1-static")
            .build();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_manifest_url_is_rejected() {
        let config = WorkerConfig::builder("v1")
            .manifest(["/ok.css", "http://[broken"])
            .build();
        assert!(matches!(config.validate(), Err(ConfigError::Url { .. })));
    }

    #[test]
    fn missing_file_reports_path() {
        let error = WorkerConfig::from_path("/definitely/not/here.yaml").unwrap_err();
        match error {
            ConfigError::Read { path, .. } => {
                assert_eq!(path, Path::new("/definitely/not/here.yaml"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
