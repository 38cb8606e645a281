use swcache_backend::PartitionName;
use swcache_core::{Request, RequestKey};

use crate::class::{Classifier, RequestClass};
use crate::config::WorkerConfig;
use crate::error::ConfigError;
use crate::lifecycle::WorkerId;
use crate::policy::{PartitionKind, Policy};

/// An installed worker version.
///
/// Built from a validated [`WorkerConfig`]: patterns are compiled and the
/// manifest is parsed up front, so nothing on the fetch path can fail on
/// configuration.
#[derive(Debug)]
pub struct Worker {
    id: WorkerId,
    config: WorkerConfig,
    classifier: Classifier,
    static_partition: PartitionName,
    dynamic_partition: PartitionName,
    offline_key: RequestKey,
    manifest: Vec<Request>,
}

impl Worker {
    pub(crate) fn new(id: WorkerId, config: WorkerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = Classifier::new(&config.classification)?;
        let manifest = config
            .manifest
            .iter()
            .map(|url| {
                Request::try_get(url).map_err(|source| ConfigError::Url {
                    url: url.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let offline_key = Request::try_get(&config.offline_page)
            .map_err(|source| ConfigError::Url {
                url: config.offline_page.clone(),
                source,
            })?
            .key();

        Ok(Self {
            id,
            static_partition: config.static_partition(),
            dynamic_partition: config.dynamic_partition(),
            classifier,
            offline_key,
            manifest,
            config,
        })
    }

    /// Install sequence identity.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Version tag.
    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// The configuration this worker was built from.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Partition populated at install.
    pub fn static_partition(&self) -> &PartitionName {
        &self.static_partition
    }

    /// Partition filled from live traffic.
    pub fn dynamic_partition(&self) -> &PartitionName {
        &self.dynamic_partition
    }

    /// Resolves a [`PartitionKind`] to this worker's partition name.
    pub fn partition(&self, kind: PartitionKind) -> &PartitionName {
        match kind {
            PartitionKind::Static => &self.static_partition,
            PartitionKind::Dynamic => &self.dynamic_partition,
        }
    }

    /// Identity of the offline page inside the static partition.
    pub fn offline_key(&self) -> &RequestKey {
        &self.offline_key
    }

    /// Requests fetched at install, in manifest order.
    pub fn manifest(&self) -> &[Request] {
        &self.manifest
    }

    /// Classifies a request with this worker's patterns.
    pub fn classify(&self, request: &Request) -> RequestClass {
        self.classifier.classify(request)
    }

    /// Policy for a request class under this worker's strategy table.
    pub fn policy_for(&self, class: RequestClass) -> Policy {
        Policy::for_class(class, &self.config.strategies)
    }

    /// Whether activation of this worker keeps `partition`.
    pub fn keeps(&self, partition: &PartitionName) -> bool {
        partition == &self.static_partition || partition == &self.dynamic_partition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Strategy;

    fn worker(config: WorkerConfig) -> Worker {
        Worker::new(WorkerId::new(1), config).unwrap()
    }

    #[test]
    fn keeps_only_own_partitions() {
        let worker = worker(WorkerConfig::builder("v2").build());
        assert!(worker.keeps(&PartitionName::from("v2-static")));
        assert!(worker.keeps(&PartitionName::from("dynamic")));
        assert!(!worker.keeps(&PartitionName::from("v1-static")));
        assert!(!worker.keeps(&PartitionName::from("radio-v1")));
    }

    #[test]
    fn policy_uses_configured_strategies() {
        let worker = worker(
            WorkerConfig::builder("v1")
                .strategy(RequestClass::Navigation, Strategy::NetworkOnly)
                .build(),
        );
        assert_eq!(
            worker.policy_for(RequestClass::Navigation).strategy,
            Strategy::NetworkOnly
        );
        assert_eq!(worker.policy_for(RequestClass::Api).strategy, Strategy::NetworkFirst);
    }

    #[test]
    fn manifest_is_parsed_in_order() {
        let worker = worker(
            WorkerConfig::builder("v1")
                .manifest(["/", "/css/styles.css", "/offline.html"])
                .build(),
        );
        let urls: Vec<_> = worker.manifest().iter().map(|r| r.uri().to_string()).collect();
        assert_eq!(urls, ["/", "/css/styles.css", "/offline.html"]);
        assert_eq!(worker.offline_key(), &RequestKey::get("/offline.html"));
    }
}
