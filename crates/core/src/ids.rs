//! Typed record identifiers.
//!
//! Every entity collection allocates its own monotonically increasing `u64`
//! sequence. The newtypes keep a visit id from being passed where a patient id is
//! expected; on the wire they are plain integers.

use serde::{Deserialize, Serialize};

/// Conversion between a typed identifier and its raw allocator value.
pub trait RecordId: Copy + Ord + std::fmt::Debug + std::fmt::Display {
    /// Human-readable collection name, used in errors and logs.
    const COLLECTION: &'static str;

    fn from_raw(raw: u64) -> Self;

    fn raw(self) -> u64;
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $collection:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl RecordId for $name {
            const COLLECTION: &'static str = $collection;

            fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            fn raw(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

record_id!(
    /// Identifier of a registered patient.
    PatientId,
    "patients"
);
record_id!(
    /// Identifier of a clinical visit.
    VisitId,
    "clinical visits"
);
record_id!(
    /// Identifier of a scheduled follow-up.
    FollowUpId,
    "follow-ups"
);
record_id!(
    /// Identifier of a prescription.
    PrescriptionId,
    "prescriptions"
);

/// Caller-supplied point in time, nanoseconds since the Unix epoch.
pub type Timestamp = i64;
