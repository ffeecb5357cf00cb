//! Queue engine: named queues, enqueue, job records and shutdown.
//!
//! Each named queue gets one drain task (see [`crate::worker`]) that is the
//! only consumer of that queue. `enqueue` appends under the queue's mutex and
//! wakes the drain task; it never waits for dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{JobRecord, NamedQueue};
use crate::app::EngineBuilder;
use crate::config::EngineConfig;
use crate::domain::{DispatchEvent, DispatchOutcome, EngineError, Job, JobId, JobOptions};
use crate::observability::QueueCounts;
use crate::ports::metrics::counters;
use crate::ports::{Clock, IdGenerator, Metrics};
use crate::registry::{JobHandler, WorkerRegistry};
use crate::typed::TypedJob;
use crate::worker;

/// A named queue shared between `enqueue` (producer) and its drain task
/// (single consumer).
pub(crate) struct SharedQueue {
    pub(crate) name: String,
    pub(crate) jobs: Mutex<NamedQueue>,
    pub(crate) notify: Notify,
}

struct QueueSlot {
    shared: Arc<SharedQueue>,
    drain: JoinHandle<()>,
}

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) registry: Arc<WorkerRegistry>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Metrics,
    ids: Arc<dyn IdGenerator>,
    queues: RwLock<HashMap<String, QueueSlot>>,
    records: RwLock<HashMap<JobId, JobRecord>>,
    events: broadcast::Sender<DispatchEvent>,
    // Dropping the sender (engine dropped) also stops every drain task.
    shutdown_tx: watch::Sender<bool>,
    closed: AtomicBool,
}

impl EngineInner {
    pub(crate) fn update_record(&self, id: JobId, f: impl FnOnce(&mut JobRecord)) {
        if let Some(record) = self.records.write().get_mut(&id) {
            f(record);
        }
    }

    /// Record a dispatch outcome and broadcast it.
    pub(crate) fn settle(&self, queue: &str, job: &Job, outcome: DispatchOutcome) {
        self.update_record(job.id, |record| record.settle(job, outcome.clone()));
        // no subscribers is fine
        let _ = self.events.send(DispatchEvent {
            queue: queue.to_string(),
            job: job.clone(),
            outcome,
        });
    }

    pub(crate) fn requeued(&self, ids: &[JobId]) {
        let mut records = self.records.write();
        for id in ids {
            if let Some(record) = records.get_mut(id) {
                record.requeue();
            }
        }
    }
}

/// In-process job queue engine.
///
/// Cheap to clone; all clones share the same queues. Must be used from within
/// a Tokio runtime: drain tasks are spawned on the first enqueue of each queue
/// name.
///
/// Call [`QueueEngine::shutdown`] to stop draining. Dropping every handle also
/// stops the drain tasks, but without waiting for in-flight handlers.
#[derive(Clone)]
pub struct QueueEngine {
    inner: Arc<EngineInner>,
}

impl QueueEngine {
    /// Engine with the given config, system clock, ULID ids and no metrics.
    pub fn new(config: EngineConfig) -> Self {
        EngineBuilder::new().config(config).build_unchecked()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn from_parts(
        config: EngineConfig,
        registry: Arc<WorkerRegistry>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        metrics: Metrics,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(EngineInner {
                config,
                registry,
                clock,
                metrics,
                ids,
                queues: RwLock::new(HashMap::new()),
                records: RwLock::new(HashMap::new()),
                events,
                shutdown_tx,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.inner.registry
    }

    /// Metrics handle shared with collaborators such as the scheduler.
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Shorthand for `registry().register(..)`.
    pub fn register(
        &self,
        job_type: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> Option<Arc<dyn JobHandler>> {
        self.inner.registry.register(job_type, handler)
    }

    /// Add a job to `queue` and return its id without waiting for dispatch.
    ///
    /// The queue is created on first use. Missing handlers and handler
    /// failures are never reported here; observe them through
    /// [`QueueEngine::subscribe`], [`QueueEngine::job`] or metrics.
    ///
    /// # Errors
    ///
    /// [`EngineError::ShutDown`] once [`QueueEngine::shutdown`] has started.
    pub async fn enqueue(
        &self,
        queue: &str,
        job_type: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<JobId, EngineError> {
        let inner = &self.inner;
        if self.is_shut_down() {
            return Err(EngineError::ShutDown);
        }

        let resolved = options.resolve(
            inner.config.default_priority,
            inner.config.default_max_attempts,
        );
        let job = Job::new(
            inner.ids.generate_job_id(),
            job_type,
            payload,
            inner.clock.now(),
            resolved,
        );
        let id = job.id;
        let priority = job.priority;

        // The record must exist before the drain task can see the job.
        inner
            .records
            .write()
            .insert(id, JobRecord::new(queue, job.clone()));

        if let Err(err) = self.push(queue, job) {
            inner.records.write().remove(&id);
            return Err(err);
        }

        inner.metrics.incr(
            counters::JOB_ADDED,
            &[("queue", queue), ("type", job_type)],
        );
        debug!(queue, job_id = %id, job_type, priority, "job added");
        Ok(id)
    }

    /// Enqueue a typed job under `T::TYPE`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Payload`] if `payload` does not serialize, otherwise as
    /// [`QueueEngine::enqueue`].
    pub async fn enqueue_typed<T: TypedJob>(
        &self,
        queue: &str,
        payload: &T,
        options: JobOptions,
    ) -> Result<JobId, EngineError> {
        let payload = serde_json::to_value(payload)?;
        self.enqueue(queue, T::TYPE, payload, options).await
    }

    fn push(&self, queue: &str, job: Job) -> Result<(), EngineError> {
        // Holding the map lock (read or write) while pushing keeps shutdown
        // from discarding a queue between the closed check and the insert.
        {
            let queues = self.inner.queues.read();
            if self.is_shut_down() {
                return Err(EngineError::ShutDown);
            }
            if let Some(slot) = queues.get(queue) {
                slot.shared.jobs.lock().push(job);
                slot.shared.notify.notify_one();
                return Ok(());
            }
        }

        let mut queues = self.inner.queues.write();
        if self.is_shut_down() {
            return Err(EngineError::ShutDown);
        }
        let slot = queues
            .entry(queue.to_string())
            .or_insert_with(|| self.spawn_queue(queue));
        slot.shared.jobs.lock().push(job);
        slot.shared.notify.notify_one();
        Ok(())
    }

    fn spawn_queue(&self, name: &str) -> QueueSlot {
        let shared = Arc::new(SharedQueue {
            name: name.to_string(),
            jobs: Mutex::new(NamedQueue::new()),
            notify: Notify::new(),
        });
        let drain = tokio::spawn(worker::drain_loop(
            Arc::downgrade(&self.inner),
            Arc::clone(&shared),
            self.inner.shutdown_tx.subscribe(),
        ));
        debug!(queue = name, "queue created");
        QueueSlot { shared, drain }
    }

    /// Latest record of a job, if the engine knows it.
    pub fn job(&self, id: JobId) -> Option<JobRecord> {
        self.inner.records.read().get(&id).cloned()
    }

    /// Ready jobs of `queue` in dispatch order (jobs waiting out a retry
    /// backoff are not included).
    pub fn pending(&self, queue: &str) -> Vec<Job> {
        self.inner
            .queues
            .read()
            .get(queue)
            .map(|slot| slot.shared.jobs.lock().snapshot())
            .unwrap_or_default()
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.inner.queues.read().keys().cloned().collect()
    }

    pub fn counts(&self) -> QueueCounts {
        self.inner
            .records
            .read()
            .values()
            .map(|record| record.state)
            .collect()
    }

    /// Receive every dispatch outcome from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.inner.events.subscribe()
    }

    /// Drop records of jobs in a terminal state. Returns how many were removed.
    pub fn forget_finished(&self) -> usize {
        let mut records = self.inner.records.write();
        let before = records.len();
        records.retain(|_, record| !record.state.is_terminal());
        before - records.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Stop accepting jobs, let every in-flight handler settle, stop the drain
    /// tasks and discard what is still queued (including pending retries).
    ///
    /// Returns the number of discarded jobs. Calling it again returns 0.
    ///
    /// There is no handler timeout, so a stalled handler stalls shutdown too.
    pub async fn shutdown(&self) -> usize {
        let slots: Vec<QueueSlot> = {
            let mut queues = self.inner.queues.write();
            if self.inner.closed.swap(true, Ordering::AcqRel) {
                return 0;
            }
            queues.drain().map(|(_, slot)| slot).collect()
        };
        info!(queues = slots.len(), "shutting down queue engine");
        self.inner.shutdown_tx.send_replace(true);

        let mut discarded = Vec::new();
        for slot in slots {
            if let Err(err) = slot.drain.await {
                debug!(queue = %slot.shared.name, error = %err, "drain task ended abnormally");
            }
            discarded.extend(slot.shared.jobs.lock().take_all().into_iter().map(|job| job.id));
        }

        {
            let mut records = self.inner.records.write();
            for id in &discarded {
                if let Some(record) = records.get_mut(id) {
                    record.mark_discarded();
                }
            }
        }
        info!(discarded = discarded.len(), "queue engine stopped");
        discarded.len()
    }
}

impl fmt::Debug for QueueEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEngine")
            .field("queues", &self.queue_names())
            .field("closed", &self.is_shut_down())
            .finish()
    }
}
