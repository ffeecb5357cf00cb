//! Job model: the unit of work and its lifecycle metadata.

use std::cmp::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::JobId;

/// A unit of asynchronous work.
///
/// Fields are public for reading. Handlers only ever see a shared reference
/// (or their own clone), so `id`, `job_type`, `attempts` and the timestamps
/// stay engine-owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,

    /// Key used to look up the handler.
    #[serde(rename = "type")]
    pub job_type: String,

    /// Opaque data handed to the handler.
    pub payload: serde_json::Value,

    /// Higher value is served first.
    pub priority: i32,

    /// Dispatch attempts made so far (incremented right before each dispatch).
    pub attempts: u32,

    /// Ceiling on attempts before the job is abandoned.
    pub max_attempts: u32,

    /// Requested initial deferral in milliseconds.
    ///
    /// Recorded only: a freshly enqueued job is eligible for dispatch
    /// immediately regardless of this value.
    pub delay_ms: u64,

    /// Set at enqueue, never refreshed on retry.
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,

    /// Last failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(
        id: JobId,
        job_type: impl Into<String>,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
        options: ResolvedOptions,
    ) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            payload,
            priority: options.priority,
            attempts: 0,
            max_attempts: options.max_attempts,
            delay_ms: options.delay_ms,
            created_at,
            processed_at: None,
            completed_at: None,
            failed_at: None,
            error: None,
        }
    }

    /// Whether another attempt is allowed after the current one.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

/// Queue ordering: `priority` descending, then `created_at` ascending.
///
/// Used with a stable sort, so jobs equal on both keys keep their insertion
/// order.
pub fn queue_order(a: &Job, b: &Job) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Caller overrides for a new job. Unset fields take the engine defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub priority: Option<i32>,
    pub max_attempts: Option<u32>,
    pub delay: Option<Duration>,
}

impl JobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fill unset fields from the given defaults.
    pub fn resolve(self, default_priority: i32, default_max_attempts: u32) -> ResolvedOptions {
        ResolvedOptions {
            priority: self.priority.unwrap_or(default_priority),
            max_attempts: self.max_attempts.unwrap_or(default_max_attempts),
            delay_ms: self
                .delay
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0),
        }
    }
}

/// `JobOptions` with every field decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub priority: i32,
    pub max_attempts: u32,
    pub delay_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn job_at(priority: i32, created_ms: i64) -> Job {
        let created_at = Utc.timestamp_millis_opt(created_ms).unwrap();
        Job::new(
            JobId::from_ulid(Ulid::new()),
            "t",
            serde_json::json!({}),
            created_at,
            JobOptions::new().priority(priority).resolve(0, 3),
        )
    }

    #[test]
    fn new_job_has_no_lifecycle_timestamps() {
        let job = job_at(0, 0);
        assert_eq!(job.attempts, 0);
        assert!(job.processed_at.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.failed_at.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn higher_priority_sorts_first() {
        let low = job_at(1, 0);
        let high = job_at(10, 5);
        assert_eq!(queue_order(&high, &low), Ordering::Less);
    }

    #[test]
    fn equal_priority_sorts_by_created_at() {
        let older = job_at(5, 0);
        let newer = job_at(5, 10);
        assert_eq!(queue_order(&older, &newer), Ordering::Less);
        assert_eq!(queue_order(&newer, &older), Ordering::Greater);
    }

    #[test]
    fn options_fall_back_to_defaults() {
        let resolved = JobOptions::new().resolve(0, 3);
        assert_eq!(
            resolved,
            ResolvedOptions {
                priority: 0,
                max_attempts: 3,
                delay_ms: 0
            }
        );

        let resolved = JobOptions::new()
            .priority(7)
            .max_attempts(1)
            .delay(Duration::from_millis(250))
            .resolve(0, 3);
        assert_eq!(resolved.priority, 7);
        assert_eq!(resolved.max_attempts, 1);
        assert_eq!(resolved.delay_ms, 250);
    }

    #[test]
    fn job_serializes_type_field() {
        let job = job_at(0, 0);
        let v = serde_json::to_value(&job).unwrap();
        assert_eq!(v["type"], "t");
        assert_eq!(v["maxAttempts"], 3);
        assert!(v.get("error").is_none());
    }
}
