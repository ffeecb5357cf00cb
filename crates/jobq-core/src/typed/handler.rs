//! Handler trait for typed jobs.
//!
//! # 二層構造
//! - `Handler<T>`: typed surface, receives the decoded payload
//! - `TypedHandler<T, H>`: type erasure into the registry's `JobHandler`

use std::marker::PhantomData;

use async_trait::async_trait;

use super::task::TypedJob;
use crate::domain::{HandlerError, Job};
use crate::registry::JobHandler;

/// Handles decoded payloads of one `TypedJob`.
///
/// `job` gives read access to the engine metadata (id, attempts, ...).
#[async_trait]
pub trait Handler<T: TypedJob>: Send + Sync {
    async fn handle(&self, payload: T, job: &Job) -> Result<(), HandlerError>;
}

/// Decodes the JSON payload into `T` and forwards to `H`.
///
/// A payload that does not decode counts as a handler failure.
pub struct TypedHandler<T: TypedJob, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TypedJob, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: TypedJob, H: Handler<T>> JobHandler for TypedHandler<T, H> {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        let payload: T = serde_json::from_value(job.payload.clone())
            .map_err(|e| HandlerError::new(format!("json decode for {}: {e}", T::TYPE)))?;
        self.handler.handle(payload, job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobId, JobOptions};
    use crate::registry::WorkerRegistry;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use ulid::Ulid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct WelcomeEmail {
        user_id: i64,
    }

    impl TypedJob for WelcomeEmail {
        const TYPE: &'static str = "notifications.welcome_email";
    }

    struct WelcomeHandler {
        last_user: Arc<AtomicI64>,
    }

    #[async_trait]
    impl Handler<WelcomeEmail> for WelcomeHandler {
        async fn handle(&self, payload: WelcomeEmail, _job: &Job) -> Result<(), HandlerError> {
            self.last_user.store(payload.user_id, Ordering::SeqCst);
            Ok(())
        }
    }

    fn job_with(payload: serde_json::Value) -> Job {
        Job::new(
            JobId::from_ulid(Ulid::new()),
            WelcomeEmail::TYPE,
            payload,
            Utc::now(),
            JobOptions::new().resolve(0, 3),
        )
    }

    #[tokio::test]
    async fn decodes_payload_before_handling() {
        let last_user = Arc::new(AtomicI64::new(0));
        let reg = WorkerRegistry::new();
        reg.register_typed::<WelcomeEmail, _>(WelcomeHandler {
            last_user: last_user.clone(),
        });

        let handler = reg.lookup(WelcomeEmail::TYPE).unwrap();
        handler
            .handle(&job_with(serde_json::json!({"user_id": 42})))
            .await
            .unwrap();
        assert_eq!(last_user.load(Ordering::SeqCst), 42);
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_failure() {
        let handler = TypedHandler::<WelcomeEmail, _>::new(WelcomeHandler {
            last_user: Arc::new(AtomicI64::new(0)),
        });

        let err = handler
            .handle(&job_with(serde_json::json!({"user": "nope"})))
            .await
            .unwrap_err();
        assert!(err.message().contains("json decode"));
    }
}
