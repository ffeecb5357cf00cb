//! Typed - 型付き Job API
//!
//! Binds a job type string to a payload type so that producers and handlers
//! cannot disagree on either. The engine itself stays untyped: typed jobs
//! are plain JSON payloads on the wire.

pub mod handler;
pub mod task;

pub use self::handler::{Handler, TypedHandler};
pub use self::task::TypedJob;
