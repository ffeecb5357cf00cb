//! Dispatch outcomes: what happened to a job when its queue reached it.
//!
//! None of this is surfaced to the caller of `enqueue`. Outcomes are recorded
//! on the job record and broadcast as [`DispatchEvent`]s so that callers (and
//! tests) can observe them without scraping logs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::job::Job;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchOutcome {
    /// The handler succeeded.
    Completed,

    /// No handler was registered for the job type; the job was dropped
    /// without a dispatch attempt.
    NoHandler,

    /// The handler failed and the job will be retried after `retry_in`.
    Failed { attempt: u32, retry_in: Duration },

    /// The handler failed on the last allowed attempt.
    Abandoned { attempt: u32 },
}

impl DispatchOutcome {
    /// Whether the job will not be dispatched again.
    pub fn is_final(&self) -> bool {
        !matches!(self, DispatchOutcome::Failed { .. })
    }
}

/// Broadcast for every dispatch outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub queue: String,

    /// Job snapshot right after the transition.
    pub job: Job,

    pub outcome: DispatchOutcome,
}
