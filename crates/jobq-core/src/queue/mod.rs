//! Queue module: named queues, job lifecycle state, retry policy and the engine.

pub mod engine;
mod memory;
mod record;
mod retry;
mod state;

pub use engine::QueueEngine;
pub use memory::NamedQueue;
pub use record::JobRecord;
pub use retry::RetryPolicy;
pub use state::JobState;
