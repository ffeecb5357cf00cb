//! App - アプリケーション層
//!
//! ports を組み合わせて [`QueueEngine`](crate::QueueEngine) を組み立てます。
//!
//! # 主要コンポーネント
//! - **EngineBuilder**: engine の構築とワイヤリング、起動時検証

pub mod builder;

pub use self::builder::{BuildError, EngineBuilder};
