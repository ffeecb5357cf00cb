//! Ports - 抽象化レイヤー
//!
//! engine が外部に依存する部分（時刻、ID 採番、メトリクス）を trait として
//! 定義します。テストでは FixedClock / InMemoryMetrics に差し替えます。

pub mod clock;
pub mod id_generator;
pub mod metrics;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::metrics::{Metrics, MetricsSink, counters};
