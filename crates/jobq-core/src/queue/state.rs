//! Job state machine for the queue.

use serde::{Deserialize, Serialize};

/// Job state.
///
/// State transitions:
/// - Queued -> Running -> Completed
/// - Queued -> Running -> RetryScheduled -> Queued (loop until max_attempts)
/// - Queued -> Running -> Abandoned (max_attempts reached)
/// - Queued -> Dropped (no handler registered at dispatch time)
/// - Queued | RetryScheduled -> Discarded (engine shut down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in its queue, eligible for dispatch.
    Queued,

    /// Handed to its handler.
    Running,

    /// Failed, waiting out the retry backoff.
    RetryScheduled,

    /// Handler succeeded.
    Completed,

    /// Failed on the last allowed attempt.
    Abandoned,

    /// No handler was registered for the job type.
    Dropped,

    /// Still pending when the engine shut down.
    Discarded,
}

impl JobState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Abandoned | JobState::Dropped | JobState::Discarded
        )
    }

    /// Is the job still held by a queue?
    pub fn is_pending(self) -> bool {
        matches!(self, JobState::Queued | JobState::RetryScheduled)
    }
}
