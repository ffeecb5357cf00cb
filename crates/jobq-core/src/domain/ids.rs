//! Domain identifiers (strongly-typed IDs).
//!
//! IDs are ULID based: they sort by creation time and can be generated
//! without coordination. `Id<T>` carries a phantom marker so that ids of
//! different kinds cannot be mixed up, while the runtime representation stays
//! a bare 16-byte ULID.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for id kinds.
///
/// Provides the prefix used by `Display` (e.g. `"job-"`).
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic ULID-backed id.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for job ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobMarker {}

impl IdMarker for JobMarker {
    fn prefix() -> &'static str {
        "job-"
    }
}

/// Identifier of an enqueued job.
pub type JobId = Id<JobMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_displays_with_prefix() {
        let ulid = Ulid::new();
        let id = JobId::from_ulid(ulid);
        assert_eq!(id.as_ulid(), ulid);
        assert_eq!(id.to_string(), format!("job-{ulid}"));
    }

    #[test]
    fn ulid_ids_are_sortable() {
        let id1 = JobId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = JobId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }

    #[test]
    fn job_id_serializes_as_bare_ulid() {
        let id = JobId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, format!("\"{}\"", id.as_ulid()));

        let back: JobId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn phantom_marker_is_zero_sized() {
        use std::mem::size_of;
        assert_eq!(size_of::<JobId>(), size_of::<Ulid>());
    }
}
