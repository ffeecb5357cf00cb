//! Domain model (ids, jobs, outcomes, errors).

pub mod errors;
pub mod ids;
pub mod job;
pub mod outcome;

pub use errors::{EngineError, HandlerError};
pub use ids::{Id, IdMarker, JobId};
pub use job::{Job, JobOptions, ResolvedOptions, queue_order};
pub use outcome::{DispatchEvent, DispatchOutcome};
