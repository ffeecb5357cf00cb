//! Scheduler - 時間起点で job を enqueue する
//!
//! - recurring timer: 名前付き、固定間隔、cancel 可能
//! - delayed timer: 無名、一回だけ、個別 cancel 不可
//!
//! Timers only ever call [`QueueEngine::enqueue`]; they never dispatch.

pub mod expression;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub use self::expression::{KnownSchedule, MIN_INTERVAL, resolve_interval};
use crate::config::SchedulerConfig;
use crate::domain::JobOptions;
use crate::ports::metrics::counters;
use crate::queue::QueueEngine;

/// Queue receiving jobs from recurring timers.
pub const SCHEDULED_QUEUE: &str = "scheduled";
/// Queue receiving jobs from delayed timers.
pub const DELAYED_QUEUE: &str = "delayed";

/// Job description handed to [`Scheduler::schedule_delayed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedJob {
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: serde_json::Value,
}

impl DelayedJob {
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            job_type: job_type.into(),
            payload,
        }
    }
}

struct RecurringTimer {
    expression: String,
    interval: Duration,
    handle: JoinHandle<()>,
}

/// Owns recurring and delayed timers feeding a [`QueueEngine`].
///
/// Timers are Tokio tasks; every `schedule_*` call must happen inside a
/// runtime. Dropping the scheduler aborts all of its timers.
pub struct Scheduler {
    engine: QueueEngine,
    config: SchedulerConfig,
    recurring: Mutex<HashMap<String, RecurringTimer>>,
    delayed: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(engine: QueueEngine, config: SchedulerConfig) -> Self {
        if config.default_interval() < MIN_INTERVAL {
            warn!(
                default_interval_ms = config.default_interval_ms,
                min_interval_ms = MIN_INTERVAL.as_millis() as u64,
                "default schedule interval too short, raising it to the minimum"
            );
        }
        Self {
            engine,
            config,
            recurring: Mutex::new(HashMap::new()),
            delayed: Mutex::new(Vec::new()),
        }
    }

    pub fn engine(&self) -> &QueueEngine {
        &self.engine
    }

    /// Start (or replace) the recurring timer `name`.
    ///
    /// Each tick enqueues a job of type `name` carrying `payload` onto
    /// [`SCHEDULED_QUEUE`]. The first tick happens one interval from now.
    /// Returns the resolved interval.
    pub fn schedule_recurring(
        &self,
        name: &str,
        payload: serde_json::Value,
        expression: &str,
    ) -> Duration {
        let interval = resolve_interval(expression, self.config.default_interval());
        if KnownSchedule::parse(expression).is_none() {
            debug!(
                timer = name,
                expression,
                "unrecognized schedule expression, using default interval"
            );
        }

        let mut recurring = self.recurring.lock();
        if let Some(previous) = recurring.remove(name) {
            previous.handle.abort();
            self.engine
                .metrics()
                .incr(counters::JOB_UNSCHEDULED, &[("name", name)]);
            debug!(timer = name, "replaced recurring timer");
        }

        let handle = tokio::spawn(run_recurring(
            self.engine.clone(),
            name.to_string(),
            payload,
            Instant::now() + interval,
            interval,
        ));
        recurring.insert(
            name.to_string(),
            RecurringTimer {
                expression: expression.to_string(),
                interval,
                handle,
            },
        );
        drop(recurring);

        self.engine.metrics().incr(
            counters::JOB_SCHEDULED,
            &[("name", name), ("schedule", expression)],
        );
        info!(
            timer = name,
            expression,
            interval_ms = interval.as_millis() as u64,
            "recurring job scheduled"
        );
        interval
    }

    /// Enqueue `job` onto [`DELAYED_QUEUE`] once, after `delay`.
    pub fn schedule_delayed(&self, job: DelayedJob, delay: Duration) {
        let engine = self.engine.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let labels = [("type", job.job_type.as_str())];
            match engine
                .enqueue(
                    DELAYED_QUEUE,
                    &job.job_type,
                    job.payload.clone(),
                    JobOptions::new(),
                )
                .await
            {
                Ok(job_id) => {
                    engine.metrics().incr(counters::DELAYED_JOB_ADDED, &labels);
                    debug!(job_id = %job_id, job_type = %job.job_type, "delayed job enqueued");
                }
                Err(err) => {
                    engine.metrics().incr(counters::DELAYED_JOB_FAILED, &labels);
                    warn!(
                        job_type = %job.job_type,
                        error = %err,
                        "delayed job could not be enqueued"
                    );
                }
            }
        });

        let mut delayed = self.delayed.lock();
        delayed.retain(|h| !h.is_finished());
        delayed.push(handle);
        debug!(delay_ms = delay.as_millis() as u64, "delayed job scheduled");
    }

    /// Stop the recurring timer `name`. Returns whether one existed.
    pub fn cancel(&self, name: &str) -> bool {
        let Some(timer) = self.recurring.lock().remove(name) else {
            return false;
        };
        timer.handle.abort();
        self.engine
            .metrics()
            .incr(counters::JOB_UNSCHEDULED, &[("name", name)]);
        info!(timer = name, "recurring job unscheduled");
        true
    }

    /// Names of the active recurring timers, in no particular order.
    pub fn list_scheduled(&self) -> Vec<String> {
        self.recurring.lock().keys().cloned().collect()
    }

    /// Interval of the recurring timer `name`.
    pub fn interval_of(&self, name: &str) -> Option<Duration> {
        self.recurring.lock().get(name).map(|t| t.interval)
    }

    /// Abort every recurring timer and every delayed timer that has not fired.
    /// Cancelled recurring timers are not counted as `job_unscheduled`.
    pub fn shutdown(&self) {
        let recurring: Vec<_> = self.recurring.lock().drain().collect();
        for (_, timer) in &recurring {
            timer.handle.abort();
        }
        let delayed: Vec<_> = self.delayed.lock().drain(..).collect();
        for handle in &delayed {
            handle.abort();
        }
        if !recurring.is_empty() || !delayed.is_empty() {
            info!(
                recurring = recurring.len(),
                delayed = delayed.len(),
                "scheduler stopped"
            );
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recurring: Vec<(String, String)> = self
            .recurring
            .lock()
            .iter()
            .map(|(name, t)| (name.clone(), t.expression.clone()))
            .collect();
        f.debug_struct("Scheduler")
            .field("recurring", &recurring)
            .field("delayed", &self.delayed.lock().len())
            .finish()
    }
}

async fn run_recurring(
    engine: QueueEngine,
    name: String,
    payload: serde_json::Value,
    start: Instant,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(start, period);
    // 遅れた tick はまとめて撃たず、そこから間隔を取り直す
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let labels = [("name", name.as_str())];

    loop {
        ticker.tick().await;
        match engine
            .enqueue(SCHEDULED_QUEUE, &name, payload.clone(), JobOptions::new())
            .await
        {
            Ok(job_id) => {
                engine.metrics().incr(counters::SCHEDULED_JOB_ADDED, &labels);
                debug!(timer = %name, job_id = %job_id, "scheduled job enqueued");
            }
            Err(err) => {
                engine.metrics().incr(counters::SCHEDULED_JOB_FAILED, &labels);
                warn!(timer = %name, error = %err, "scheduled tick failed to enqueue");
            }
        }
    }
}
