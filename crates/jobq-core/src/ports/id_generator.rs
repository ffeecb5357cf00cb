//! IdGenerator port - job id generation.
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::JobId;
use crate::ports::Clock;

/// IdGenerator produces unique job ids.
///
/// `Send + Sync` so the engine can share it between enqueue callers.
pub trait IdGenerator: Send + Sync {
    fn generate_job_id(&self) -> JobId;
}

/// ULID-based generator.
///
/// The timestamp part comes from the injected clock, so ids generated under a
/// `FixedClock` share their time prefix and differ in the random part only.
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_job_id(&self) -> JobId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        JobId::from(ulid)
    }
}
