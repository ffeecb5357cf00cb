use serde::{Deserialize, Serialize};

use crate::queue::JobState;

/// Number of known jobs per state, across all queues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub running: usize,
    pub retry_scheduled: usize,
    pub completed: usize,
    pub abandoned: usize,
    pub dropped: usize,
    pub discarded: usize,
}

impl QueueCounts {
    pub fn record(&mut self, state: JobState) {
        match state {
            JobState::Queued => self.queued += 1,
            JobState::Running => self.running += 1,
            JobState::RetryScheduled => self.retry_scheduled += 1,
            JobState::Completed => self.completed += 1,
            JobState::Abandoned => self.abandoned += 1,
            JobState::Dropped => self.dropped += 1,
            JobState::Discarded => self.discarded += 1,
        }
    }

    /// Jobs that may still be dispatched.
    pub fn in_flight(&self) -> usize {
        self.queued + self.running + self.retry_scheduled
    }
}

impl FromIterator<JobState> for QueueCounts {
    fn from_iter<I: IntoIterator<Item = JobState>>(iter: I) -> Self {
        let mut counts = QueueCounts::default();
        for state in iter {
            counts.record(state);
        }
        counts
    }
}
