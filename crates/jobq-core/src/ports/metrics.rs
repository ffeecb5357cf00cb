//! MetricsSink port - counter increments for lifecycle transitions.
//!
//! The sink is optional. [`Metrics`] wraps an optional sink so call sites do
//! not have to branch; with no sink attached every increment is a no-op.

use std::fmt;
use std::sync::Arc;

/// Counter names emitted by the engine and the scheduler.
pub mod counters {
    pub const JOB_ADDED: &str = "job_added";
    pub const JOB_COMPLETED: &str = "job_completed";
    pub const JOB_FAILED: &str = "job_failed";
    pub const SCHEDULED_JOB_ADDED: &str = "scheduled_job_added";
    pub const SCHEDULED_JOB_FAILED: &str = "scheduled_job_failed";
    pub const JOB_SCHEDULED: &str = "job_scheduled";
    pub const JOB_UNSCHEDULED: &str = "job_unscheduled";
    pub const DELAYED_JOB_ADDED: &str = "delayed_job_added";
    pub const DELAYED_JOB_FAILED: &str = "delayed_job_failed";
}

/// MetricsSink receives counter increments.
///
/// Implementations must not block: they are called from the drain loop and
/// from timer tasks.
pub trait MetricsSink: Send + Sync {
    fn increment_counter(&self, name: &str, amount: u64, labels: &[(&str, &str)]);
}

/// Optional metrics sink handle.
#[derive(Clone, Default)]
pub struct Metrics {
    sink: Option<Arc<dyn MetricsSink>>,
}

impl Metrics {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Increment `name` by one.
    pub fn incr(&self, name: &str, labels: &[(&str, &str)]) {
        if let Some(sink) = &self.sink {
            sink.increment_counter(name, 1, labels);
        }
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl From<Option<Arc<dyn MetricsSink>>> for Metrics {
    fn from(sink: Option<Arc<dyn MetricsSink>>) -> Self {
        Self { sink }
    }
}
