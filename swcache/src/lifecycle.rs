use std::fmt;

use serde::Serialize;

/// Identity of an installed worker. Assigned in install order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw install sequence number.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// State of a worker instance.
///
/// ```text
/// Installing ──▶ Waiting ──▶ Active ──▶ Redundant
///     │             │                      ▲
///     └─────────────┴──────────────────────┘
/// ```
///
/// At most one worker is `Active` at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Populating its static partition.
    Installing,
    /// Installed, waiting for the active worker to step aside.
    Waiting,
    /// Serving fetches.
    Active,
    /// Replaced, superseded or failed. Terminal.
    Redundant,
}

impl WorkerState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Installing, Waiting)
                | (Installing, Redundant)
                | (Waiting, Active)
                | (Waiting, Redundant)
                | (Active, Redundant)
        )
    }

    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installing => "installing",
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification surfaced to the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    /// A new version finished installing and waits for activation.
    UpdateAvailable {
        /// The waiting worker.
        worker: WorkerId,
        /// Its version tag.
        version: String,
    },
    /// A worker became active.
    Activated {
        /// The new active worker.
        worker: WorkerId,
        /// Its version tag.
        version: String,
    },
    /// An install failed; the previous worker stays active.
    InstallFailed {
        /// The failed worker.
        worker: WorkerId,
        /// Its version tag.
        version: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        use WorkerState::*;
        assert!(Installing.can_transition_to(Waiting));
        assert!(Waiting.can_transition_to(Active));
        assert!(Active.can_transition_to(Redundant));
        assert!(Waiting.can_transition_to(Redundant));
        assert!(!Installing.can_transition_to(Active));
        assert!(!Active.can_transition_to(Waiting));
        assert!(!Redundant.can_transition_to(Active));
    }

    #[test]
    fn event_json_shape() {
        let event = LifecycleEvent::Activated {
            worker: WorkerId::new(2),
            version: "v2".to_owned(),
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"ACTIVATED","worker":2,"version":"v2"}"#
        );
    }
}
