//! EngineBuilder - engine の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - ports (Clock / IdGenerator / MetricsSink) の差し替え

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::ports::{Clock, IdGenerator, Metrics, MetricsSink, SystemClock, UlidGenerator};
use crate::queue::QueueEngine;
use crate::registry::{JobHandler, WorkerRegistry};
use crate::typed::{Handler, TypedJob};

/// Builds a [`QueueEngine`].
///
/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new()
///     .typed::<WelcomeEmail, _>(WelcomeHandler)
///     .expect_types(&["notifications.welcome_email"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_types() で期待される job type を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError を返す
///
/// Handlers can still be registered on the engine after `build()`; the check
/// only covers what the caller declared up front.
pub struct EngineBuilder {
    config: EngineConfig,
    registry: WorkerRegistry,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    metrics: Metrics,
    expected_types: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing job types: {0:?}. These job types were expected but have no handler.")]
    MissingJobTypes(Vec<String>),
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: WorkerRegistry::new(),
            clock: None,
            ids: None,
            metrics: Metrics::disabled(),
            expected_types: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock used for job timestamps (and ULID time prefixes unless an id
    /// generator is set).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Metrics::new(sink);
        self
    }

    pub fn handler(self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        self.registry.register(job_type, handler);
        self
    }

    pub fn typed<T: TypedJob, H: Handler<T> + 'static>(self, handler: H) -> Self {
        self.registry.register_typed::<T, H>(handler);
        self
    }

    /// 期待される job type のリストを設定
    pub fn expect_types(mut self, job_types: &[&str]) -> Self {
        self.expected_types = Some(job_types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// # 検証
    /// - expect_types() で設定された job type が全て登録されているかチェック
    /// - 不足があれば BuildError::MissingJobTypes を返す
    pub fn build(self) -> Result<QueueEngine, BuildError> {
        if let Some(expected) = &self.expected_types {
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| !self.registry.contains(t))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingJobTypes(missing));
            }
        }
        Ok(self.build_unchecked())
    }

    pub(crate) fn build_unchecked(self) -> QueueEngine {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        QueueEngine::from_parts(
            self.config,
            Arc::new(self.registry),
            clock,
            ids,
            self.metrics,
        )
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
