//! Metric names and recorders.
//!
//! Every recorder here compiles to nothing unless the `metrics` feature is
//! enabled. Names are registered with their description on first use.

use std::time::Duration;

use crate::class::RequestClass;
use crate::executor::ResponseSource;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Responses served, labelled by class and source.
    pub static ref RESPONSES: &'static str = {
        metrics::describe_counter!(
            "swcache_responses_total",
            "Total number of responses served, by request class and source."
        );
        "swcache_responses_total"
    };
    /// Duration of intercepted fetches.
    pub static ref FETCH_DURATION: &'static str = {
        metrics::describe_histogram!(
            "swcache_fetch_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of intercepted fetches in seconds."
        );
        "swcache_fetch_duration_seconds"
    };
    /// Worker installs, labelled by outcome.
    pub static ref INSTALLS: &'static str = {
        metrics::describe_counter!(
            "swcache_installs_total",
            "Total number of worker installs, by outcome."
        );
        "swcache_installs_total"
    };
    /// Partitions deleted on activation.
    pub static ref PARTITIONS_PURGED: &'static str = {
        metrics::describe_counter!(
            "swcache_partitions_purged_total",
            "Total number of partitions deleted during activation."
        );
        "swcache_partitions_purged_total"
    };

    /// Background tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "swcache_offload_tasks_spawned_total",
            "Total number of background tasks spawned."
        );
        "swcache_offload_tasks_spawned_total"
    };
    /// Background tasks that ran to completion.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "swcache_offload_tasks_completed_total",
            "Total number of background tasks completed."
        );
        "swcache_offload_tasks_completed_total"
    };
    /// Background tasks dropped by the timeout policy.
    pub static ref OFFLOAD_TASKS_TIMEOUT: &'static str = {
        metrics::describe_counter!(
            "swcache_offload_tasks_timeout_total",
            "Total number of background tasks cancelled after timing out."
        );
        "swcache_offload_tasks_timeout_total"
    };
    /// Refreshes skipped because one for the same entry was running.
    pub static ref OFFLOAD_TASKS_DEDUPLICATED: &'static str = {
        metrics::describe_counter!(
            "swcache_offload_tasks_deduplicated_total",
            "Total number of refreshes skipped because one was already in flight."
        );
        "swcache_offload_tasks_deduplicated_total"
    };
    /// Tasks skipped because the concurrency bound was reached.
    pub static ref OFFLOAD_TASKS_REJECTED: &'static str = {
        metrics::describe_counter!(
            "swcache_offload_tasks_rejected_total",
            "Total number of background tasks skipped at the concurrency bound."
        );
        "swcache_offload_tasks_rejected_total"
    };
    /// Background tasks currently running.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "swcache_offload_tasks_active",
            "Number of background tasks currently running."
        );
        "swcache_offload_tasks_active"
    };
    /// Duration of background tasks.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "swcache_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of background tasks in seconds."
        );
        "swcache_offload_task_duration_seconds"
    };
}

/// Record one served response.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_response(class: RequestClass, source: ResponseSource, duration: Duration) {
    metrics::counter!(
        *RESPONSES,
        "class" => class.as_str(),
        "source" => source.as_str()
    )
    .increment(1);
    metrics::histogram!(*FETCH_DURATION, "class" => class.as_str())
        .record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_response(_class: RequestClass, _source: ResponseSource, _duration: Duration) {}

/// Record the outcome of an install.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_install(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(*INSTALLS, "outcome" => outcome).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_install(_success: bool) {}

/// Record partitions deleted by an activation.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_partitions_purged(count: usize) {
    metrics::counter!(*PARTITIONS_PURGED).increment(count as u64);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_partitions_purged(_count: usize) {}

#[inline]
pub(crate) fn offload_spawned(kind: &str) {
    #[cfg(feature = "metrics")]
    {
        metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "kind" => kind.to_owned()).increment(1);
        metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.to_owned()).increment(1.0);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

#[inline]
pub(crate) fn offload_deduplicated(kind: &str) {
    #[cfg(feature = "metrics")]
    metrics::counter!(*OFFLOAD_TASKS_DEDUPLICATED, "kind" => kind.to_owned()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

#[inline]
pub(crate) fn offload_rejected(kind: &str) {
    #[cfg(feature = "metrics")]
    metrics::counter!(*OFFLOAD_TASKS_REJECTED, "kind" => kind.to_owned()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

#[inline]
pub(crate) fn offload_completed(kind: &str, elapsed: Duration) {
    #[cfg(feature = "metrics")]
    {
        metrics::counter!(*OFFLOAD_TASKS_COMPLETED, "kind" => kind.to_owned()).increment(1);
        offload_finished(kind, elapsed);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (kind, elapsed);
}

#[inline]
pub(crate) fn offload_timed_out(kind: &str, elapsed: Duration) {
    #[cfg(feature = "metrics")]
    {
        metrics::counter!(*OFFLOAD_TASKS_TIMEOUT, "kind" => kind.to_owned()).increment(1);
        offload_finished(kind, elapsed);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (kind, elapsed);
}

#[cfg(feature = "metrics")]
fn offload_finished(kind: &str, elapsed: Duration) {
    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.to_owned()).decrement(1.0);
    metrics::histogram!(*OFFLOAD_TASK_DURATION, "kind" => kind.to_owned())
        .record(elapsed.as_secs_f64());
}
