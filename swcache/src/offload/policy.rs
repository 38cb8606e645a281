use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to a background task that runs too long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutPolicy {
    /// Let the task run to completion.
    #[default]
    None,
    /// Drop the task once the duration elapses.
    Cancel(#[serde(with = "humantime_serde")] Duration),
    /// Let the task finish but log a warning if it exceeded the duration.
    Warn(#[serde(with = "humantime_serde")] Duration),
}

/// Settings of the background refresh [`OffloadManager`](super::OffloadManager).
///
/// Deserializable so hosts can keep it next to their worker configs:
///
/// ```yaml
/// max_concurrent_tasks: 16
/// deduplicate: true
/// timeout_policy:
///   cancel: 30s
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffloadConfig {
    /// Upper bound on tasks in flight. Further refreshes are skipped while
    /// the bound is reached. `None` means unbounded.
    pub max_concurrent_tasks: Option<usize>,
    /// Timeout applied to every task.
    pub timeout_policy: TimeoutPolicy,
    /// Skip a refresh when one for the same entry is still running.
    pub deduplicate: bool,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: None,
            timeout_policy: TimeoutPolicy::None,
            deduplicate: true,
        }
    }
}

impl OffloadConfig {
    /// Create a new builder for OffloadConfig.
    pub fn builder() -> OffloadConfigBuilder {
        OffloadConfigBuilder::default()
    }
}

/// Builder for [`OffloadConfig`].
#[derive(Debug, Clone, Default)]
pub struct OffloadConfigBuilder {
    config: OffloadConfig,
}

impl OffloadConfigBuilder {
    /// Bound the number of tasks in flight.
    pub fn max_concurrent_tasks(mut self, max: usize) -> Self {
        self.config.max_concurrent_tasks = Some(max);
        self
    }

    /// Set the timeout policy.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.config.timeout_policy = policy;
        self
    }

    /// Cancel tasks running longer than `duration`.
    pub fn timeout(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Cancel(duration))
    }

    /// Enable or disable deduplication of refreshes.
    pub fn deduplicate(mut self, enabled: bool) -> Self {
        self.config.deduplicate = enabled;
        self
    }

    /// Build the OffloadConfig.
    pub fn build(self) -> OffloadConfig {
        self.config
    }
}
