//! Worker registry: job type -> handler.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{HandlerError, Job};
use crate::typed::{Handler, TypedHandler, TypedJob};

/// A handler for one job type.
///
/// Receives the job by shared reference: engine-owned fields cannot be
/// written back. Returning `Err` makes the engine retry the job (up to
/// `max_attempts`).
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError>;
}

/// Adapts an async closure into a [`JobHandler`].
///
/// The closure gets an owned clone of the job.
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a handler.
///
/// ```ignore
/// registry.register("send_email", handler_fn(|job: Job| async move {
///     mailer.send(&job.payload).await.map_err(|e| HandlerError::from_error(&e))
/// }));
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<FnHandler<F>>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        (self.f)(job.clone()).await
    }
}

/// Registry of handlers (job_type -> handler).
///
/// Registration is allowed at any time, including while queues are draining;
/// a job picks up whatever handler is registered when it is dispatched.
/// Registering a type twice replaces the earlier handler (last write wins).
#[derive(Default)]
pub struct WorkerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `job_type`, returning the handler it replaced.
    pub fn register(
        &self,
        job_type: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> Option<Arc<dyn JobHandler>> {
        let job_type = job_type.into();
        let replaced = self.handlers.write().insert(job_type.clone(), handler);
        if replaced.is_some() {
            debug!(job_type = %job_type, "replaced existing handler");
        } else {
            debug!(job_type = %job_type, "registered handler");
        }
        replaced
    }

    /// Register a typed handler under `T::TYPE`.
    pub fn register_typed<T, H>(&self, handler: H) -> Option<Arc<dyn JobHandler>>
    where
        T: TypedJob,
        H: Handler<T> + 'static,
    {
        self.register(T::TYPE, Arc::new(TypedHandler::<T, H>::new(handler)))
    }

    pub fn lookup(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.read().get(job_type).cloned()
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.handlers.read().contains_key(job_type)
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobId, JobOptions};
    use chrono::Utc;
    use ulid::Ulid;

    struct OkHandler;

    #[async_trait]
    impl JobHandler for OkHandler {
        async fn handle(&self, _job: &Job) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct FailHandler(&'static str);

    #[async_trait]
    impl JobHandler for FailHandler {
        async fn handle(&self, _job: &Job) -> Result<(), HandlerError> {
            Err(HandlerError::new(self.0))
        }
    }

    fn job(job_type: &str) -> Job {
        Job::new(
            JobId::from_ulid(Ulid::new()),
            job_type,
            serde_json::json!({"to": "a@example.com"}),
            Utc::now(),
            JobOptions::new().resolve(0, 3),
        )
    }

    #[tokio::test]
    async fn lookup_returns_registered_handler() {
        let reg = WorkerRegistry::new();
        assert!(reg.register("ok", Arc::new(OkHandler)).is_none());

        let handler = reg.lookup("ok").unwrap();
        handler.handle(&job("ok")).await.unwrap();
        assert!(reg.lookup("missing").is_none());
        assert_eq!(reg.registered_types(), vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn second_registration_replaces_first() {
        let reg = WorkerRegistry::new();
        reg.register("t", Arc::new(OkHandler));
        let replaced = reg.register("t", Arc::new(FailHandler("second")));
        assert!(replaced.is_some());
        assert_eq!(reg.len(), 1);

        let err = reg.lookup("t").unwrap().handle(&job("t")).await.unwrap_err();
        assert_eq!(err.message(), "second");
    }

    #[tokio::test]
    async fn closures_can_be_handlers() {
        let reg = WorkerRegistry::new();
        reg.register(
            "echo",
            handler_fn(|job: Job| async move {
                if job.payload["to"].is_string() {
                    Ok(())
                } else {
                    Err(HandlerError::new("missing recipient"))
                }
            }),
        );

        let handler = reg.lookup("echo").unwrap();
        assert!(handler.handle(&job("echo")).await.is_ok());

        let mut bad = job("echo");
        bad.payload = serde_json::json!({});
        assert!(handler.handle(&bad).await.is_err());
    }
}
