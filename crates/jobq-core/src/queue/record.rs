//! Job record: latest job snapshot + lifecycle state.

use serde::Serialize;

use super::JobState;
use crate::domain::{DispatchOutcome, Job};

/// What the engine knows about a job.
///
/// Design:
/// - The queues own the live `Job`; the record holds a snapshot refreshed at
///   every transition so that lookups never touch a queue lock.
/// - All state transitions happen here.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub queue: String,
    pub job: Job,
    pub state: JobState,

    /// Outcome of the most recent dispatch, if any.
    pub last_outcome: Option<DispatchOutcome>,
}

impl JobRecord {
    pub fn new(queue: impl Into<String>, job: Job) -> Self {
        Self {
            queue: queue.into(),
            job,
            state: JobState::Queued,
            last_outcome: None,
        }
    }

    pub fn mark_running(&mut self, job: &Job) {
        self.job = job.clone();
        self.state = JobState::Running;
    }

    /// Record a dispatch outcome together with the resulting state.
    pub fn settle(&mut self, job: &Job, outcome: DispatchOutcome) {
        self.state = match &outcome {
            DispatchOutcome::Completed => JobState::Completed,
            DispatchOutcome::NoHandler => JobState::Dropped,
            DispatchOutcome::Failed { .. } => JobState::RetryScheduled,
            DispatchOutcome::Abandoned { .. } => JobState::Abandoned,
        };
        self.job = job.clone();
        self.last_outcome = Some(outcome);
    }

    /// Backoff elapsed; back in the queue.
    pub fn requeue(&mut self) {
        if self.state == JobState::RetryScheduled {
            self.state = JobState::Queued;
        }
    }

    pub fn mark_discarded(&mut self) {
        if self.state.is_pending() {
            self.state = JobState::Discarded;
        }
    }
}
