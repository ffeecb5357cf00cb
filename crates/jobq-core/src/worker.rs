use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::domain::{DispatchOutcome, HandlerError, Job};
use crate::ports::metrics::counters;
use crate::queue::engine::{EngineInner, SharedQueue};

enum Next {
    Dispatch(Job),
    Wait(Option<Instant>),
}

/// Drain loop of one named queue.
/// - the only consumer of `queue`: at most one dispatch in flight per queue
/// - stops on shutdown, or when the engine is dropped (`shutdown_tx` dropped)
/// - holds the engine weakly while idle
pub(crate) async fn drain_loop(
    engine: Weak<EngineInner>,
    queue: Arc<SharedQueue>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!(queue = %queue.name, "drain loop started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // queue の lock はこのブロック内で完結させる（await を跨がない）
        let (promoted, next) = {
            let mut jobs = queue.jobs.lock();
            let promoted = jobs.promote_due(Instant::now());
            let next = match jobs.pop_head() {
                Some(job) => Next::Dispatch(job),
                None => Next::Wait(jobs.next_retry_at()),
            };
            (promoted, next)
        };

        let Some(inner) = engine.upgrade() else {
            break;
        };
        if !promoted.is_empty() {
            inner.requeued(&promoted);
        }

        match next {
            Next::Dispatch(job) => {
                dispatch(&inner, &queue, job).await;
                drop(inner);
                // 次の job の前に他のタスク (enqueue 側など) に譲る
                tokio::task::yield_now().await;
            }
            Next::Wait(retry_at) => {
                drop(inner);
                let retry_due = async move {
                    match retry_at {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                };
                tokio::select! {
                    _ = queue.notify.notified() => {}
                    _ = retry_due => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
    debug!(queue = %queue.name, "drain loop stopped");
}

/// Run one job to its outcome.
///
/// The handler runs in its own task so that a panic becomes a failed attempt
/// instead of killing the drain loop.
async fn dispatch(inner: &EngineInner, queue: &SharedQueue, mut job: Job) {
    let Some(handler) = inner.registry.lookup(&job.job_type) else {
        warn!(
            queue = %queue.name,
            job_id = %job.id,
            job_type = %job.job_type,
            "no handler registered for job type, dropping job"
        );
        inner.settle(&queue.name, &job, DispatchOutcome::NoHandler);
        return;
    };

    job.processed_at = Some(inner.clock.now());
    job.attempts += 1;
    inner.update_record(job.id, |record| record.mark_running(&job));
    debug!(
        queue = %queue.name,
        job_id = %job.id,
        job_type = %job.job_type,
        attempt = job.attempts,
        "dispatching job"
    );

    let attempt = job.clone();
    let result = match tokio::spawn(async move { handler.handle(&attempt).await }).await {
        Ok(result) => result,
        Err(join_err) => Err(HandlerError::new(format!("handler panicked: {join_err}"))),
    };

    let labels = [("queue", queue.name.as_str()), ("type", job.job_type.as_str())];
    let outcome = match result {
        Ok(()) => {
            job.completed_at = Some(inner.clock.now());
            inner.metrics.incr(counters::JOB_COMPLETED, &labels);
            debug!(queue = %queue.name, job_id = %job.id, attempt = job.attempts, "job completed");
            DispatchOutcome::Completed
        }
        Err(err) => {
            job.error = Some(err.message().to_string());
            job.failed_at = Some(inner.clock.now());
            inner.metrics.incr(counters::JOB_FAILED, &labels);

            if job.can_retry() {
                let retry_in = inner.config.retry.next_delay(job.attempts);
                warn!(
                    queue = %queue.name,
                    job_id = %job.id,
                    job_type = %job.job_type,
                    attempt = job.attempts,
                    max_attempts = job.max_attempts,
                    retry_in_ms = retry_in.as_millis() as u64,
                    error = %err,
                    "job failed, retry scheduled"
                );
                queue
                    .jobs
                    .lock()
                    .schedule_retry(job.clone(), Instant::now() + retry_in);
                DispatchOutcome::Failed {
                    attempt: job.attempts,
                    retry_in,
                }
            } else {
                warn!(
                    queue = %queue.name,
                    job_id = %job.id,
                    job_type = %job.job_type,
                    attempt = job.attempts,
                    error = %err,
                    "job failed on its last attempt, abandoning"
                );
                DispatchOutcome::Abandoned {
                    attempt: job.attempts,
                }
            }
        }
    };

    inner.settle(&queue.name, &job, outcome);
}
