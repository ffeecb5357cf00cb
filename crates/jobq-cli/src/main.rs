mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jobq_core::impls::InMemoryMetrics;
use jobq_core::{
    DelayedJob, DispatchOutcome, Handler, HandlerError, Job, JobOptions, QueueEngine, Scheduler,
    TypedJob, handler_fn,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CliConfig;

#[derive(Debug, Serialize, Deserialize)]
struct HelloPayload {
    name: String,
}

impl TypedJob for HelloPayload {
    const TYPE: &'static str = "hello";
}

/// Fails the first `n` attempts, then greets.
struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Handler<HelloPayload> for HelloHandler {
    async fn handle(&self, payload: HelloPayload, job: &Job) -> Result<(), HandlerError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(format!("intentional failure (left={left})").into());
        }
        tracing::info!(attempt = job.attempts, "Hello, {}!", payload.name);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobq_core=debug,jobq_cli=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CliConfig::load()?;
    tracing::debug!(?config, "configuration loaded");

    // (A) engine と handler を用意
    let metrics = Arc::new(InMemoryMetrics::new());
    let engine = QueueEngine::builder()
        .config(config.engine.clone())
        .metrics(metrics.clone())
        .typed::<HelloPayload, _>(HelloHandler::new(1))
        .handler(
            "reminder",
            handler_fn(|job: Job| async move {
                tracing::info!(payload = %job.payload, "reminder sent");
                Ok(())
            }),
        )
        .handler("heartbeat", handler_fn(|_job: Job| async { Ok(()) }))
        .expect_types(&[HelloPayload::TYPE, "reminder", "heartbeat"])
        .build()?;
    let mut events = engine.subscribe();

    // (B) job 投入 + timer 登録
    engine
        .enqueue_typed(
            "greetings",
            &HelloPayload {
                name: "jobq".to_string(),
            },
            JobOptions::new().priority(10),
        )
        .await?;
    engine
        .enqueue("greetings", "unknown", serde_json::json!({}), JobOptions::new())
        .await?;

    let scheduler = Scheduler::new(engine.clone(), config.scheduler.clone());
    scheduler.schedule_recurring("heartbeat", serde_json::json!({}), "every minute");
    scheduler.schedule_delayed(
        DelayedJob::new("reminder", serde_json::json!({"to": "demo"})),
        Duration::from_secs(1),
    );

    // (C) 3 job (hello, unknown, reminder) が片付くまで待つ
    let wait = async {
        let mut settled = 0;
        while settled < 3 {
            match events.recv().await {
                Ok(event) => {
                    tracing::info!(
                        queue = %event.queue,
                        job_id = %event.job.id,
                        outcome = ?event.outcome,
                        "dispatch event"
                    );
                    if event.outcome.is_final() {
                        settled += 1;
                    }
                    if let DispatchOutcome::Failed { retry_in, .. } = event.outcome {
                        tracing::info!(
                            retry_in_ms = retry_in.as_millis() as u64,
                            "waiting for retry"
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "event stream interrupted");
                    break;
                }
            }
        }
    };
    let timeout = Duration::from_millis(config.engine.retry.base_delay_ms * 3 + 5_000);
    if tokio::time::timeout(timeout, wait).await.is_err() {
        tracing::warn!(?timeout, "gave up waiting for jobs");
    }

    // (D) 状態を出力して停止
    println!("scheduled: {:?}", scheduler.list_scheduled());
    println!("counts: {}", serde_json::to_string(&engine.counts())?);
    for sample in metrics.snapshot() {
        println!("metric {} {:?} = {}", sample.name, sample.labels, sample.value);
    }

    scheduler.shutdown();
    let discarded = engine.shutdown().await;
    tracing::info!(discarded, "done");
    Ok(())
}
