use crate::identity::Role;
use crate::ids::{FollowUpId, PatientId, PrescriptionId, VisitId};
use crate::repositories::follow_ups::FollowUpStatus;

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("caller role {actual} is insufficient, {required} required")]
    Unauthorized { required: Role, actual: Role },
    #[error("patient {0} not found")]
    PatientNotFound(PatientId),
    #[error("clinical visit {0} not found")]
    VisitNotFound(VisitId),
    #[error("prescription {0} not found")]
    PrescriptionNotFound(PrescriptionId),
    #[error("follow-up {0} not found")]
    FollowUpNotFound(FollowUpId),
    #[error(
        "clinical visit {visit_id} belongs to patient {visit_patient_id}, not patient {supplied_patient_id}"
    )]
    VisitPatientMismatch {
        visit_id: VisitId,
        visit_patient_id: PatientId,
        supplied_patient_id: PatientId,
    },
    #[error("follow-up {id} cannot move from {from} to {to}")]
    FollowUpTransition {
        id: FollowUpId,
        from: FollowUpStatus,
        to: FollowUpStatus,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] opd_types::TextError),
    #[error("identifier space exhausted for {0}")]
    IdSpaceExhausted(&'static str),
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read snapshot file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write snapshot file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize snapshot: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize snapshot: {0}")]
    Deserialization(serde_json::Error),
    #[error("unsupported snapshot format version {0}")]
    UnsupportedSnapshotVersion(u32),
}

impl ClinicError {
    /// True for the variants that report a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ClinicError::PatientNotFound(_)
                | ClinicError::VisitNotFound(_)
                | ClinicError::PrescriptionNotFound(_)
                | ClinicError::FollowUpNotFound(_)
        )
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
