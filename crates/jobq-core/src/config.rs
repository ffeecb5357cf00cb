//! Engine and scheduler configuration.
//!
//! Every field has a default, so an empty document deserializes into the
//! stock behavior (priority 0, 3 attempts, fixed 5 s backoff, 60 s fallback
//! schedule interval).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::RetryPolicy;

/// Queue engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Priority of jobs enqueued without an explicit priority.
    #[serde(default)]
    pub default_priority: i32,

    /// `max_attempts` of jobs enqueued without an explicit value.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,

    /// Backoff applied before a failed job is retried.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Buffer of the dispatch event broadcast channel. Slow subscribers
    /// lag past this many events.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_priority: 0,
            default_max_attempts: default_max_attempts(),
            retry: RetryPolicy::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_event_capacity() -> usize {
    1024
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval used for schedule expressions outside the known table.
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,
}

impl SchedulerConfig {
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
        }
    }
}

const fn default_interval_ms() -> u64 {
    60_000
}
