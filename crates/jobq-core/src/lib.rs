//! jobq-core
//!
//! In-process job queue and scheduler.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, job, outcome, errors）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, MetricsSink）
//! - **queue**: named queue、job record、retry policy、QueueEngine
//! - **worker**: queue ごとの drain loop（queue 内は直列、queue 間は並行）
//! - **registry**: job type → handler
//! - **scheduler**: recurring / delayed timer
//! - **typed**: 型付き Job API（TypedJob trait, Handler trait）
//! - **app**: EngineBuilder（起動時検証つき）
//! - **impls**: 実装（InMemoryMetrics など開発用）
//!
//! # Quick start
//! ```ignore
//! let engine = QueueEngine::builder()
//!     .handler("send_email", handler_fn(|job: Job| async move { send(job).await }))
//!     .build()?;
//! engine.enqueue("email", "send_email", json!({"to": "a@b.c"}), JobOptions::new()).await?;
//!
//! let scheduler = Scheduler::new(engine.clone(), SchedulerConfig::default());
//! scheduler.schedule_recurring("cleanup", json!({}), "daily");
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod typed;
mod worker;

pub use app::{BuildError, EngineBuilder};
pub use config::{EngineConfig, SchedulerConfig};
pub use domain::{
    DispatchEvent, DispatchOutcome, EngineError, HandlerError, Job, JobId, JobOptions,
};
pub use observability::QueueCounts;
pub use queue::{JobRecord, JobState, QueueEngine, RetryPolicy};
pub use registry::{JobHandler, WorkerRegistry, handler_fn};
pub use scheduler::{DELAYED_QUEUE, DelayedJob, SCHEDULED_QUEUE, Scheduler};
pub use typed::{Handler, TypedJob};
