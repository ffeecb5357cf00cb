//! Impls - 実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryMetrics**: counter を保持するだけの MetricsSink

pub mod inmem_metrics;

pub use self::inmem_metrics::{CounterSample, InMemoryMetrics};
