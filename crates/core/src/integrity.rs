//! Referential checks across collections.
//!
//! Callers pass in the collections they hold locks on, so a check and the write
//! it guards see the same state.

use crate::error::{ClinicError, ClinicResult};
use crate::ids::{PatientId, VisitId};
use crate::repositories::patients::Patient;
use crate::repositories::shared::Collection;
use crate::repositories::visits::ClinicalVisit;

/// # Errors
///
/// Returns [`ClinicError::PatientNotFound`] if `patient_id` is not registered.
pub fn require_patient(
    patients: &Collection<Patient>,
    patient_id: PatientId,
) -> ClinicResult<&Patient> {
    patients
        .get(patient_id)
        .ok_or(ClinicError::PatientNotFound(patient_id))
}

/// Checks that a prescription may reference both `patient_id` and `visit_id`.
///
/// The patient is checked first, then the visit, then that the visit belongs to
/// that patient.
///
/// # Errors
///
/// - [`ClinicError::PatientNotFound`] if the patient does not exist.
/// - [`ClinicError::VisitNotFound`] if the visit does not exist.
/// - [`ClinicError::VisitPatientMismatch`] if the visit belongs to another patient.
pub fn require_visit_of_patient<'a>(
    patients: &Collection<Patient>,
    visits: &'a Collection<ClinicalVisit>,
    patient_id: PatientId,
    visit_id: VisitId,
) -> ClinicResult<&'a ClinicalVisit> {
    require_patient(patients, patient_id)?;

    let visit = visits
        .get(visit_id)
        .ok_or(ClinicError::VisitNotFound(visit_id))?;

    if visit.patient_id != patient_id {
        return Err(ClinicError::VisitPatientMismatch {
            visit_id,
            visit_patient_id: visit.patient_id,
            supplied_patient_id: patient_id,
        });
    }

    Ok(visit)
}
