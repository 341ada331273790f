//! Wire types for the OPD APIs.
//!
//! Field names are camelCase. Identifiers travel as plain numbers and timestamps as
//! nanoseconds since the Unix epoch. Requests convert into core types with `TryFrom`
//! where free-form strings (gender, role, profile name) need validating; responses
//! convert from core types with `From`.

use opd_core::{
    ClinicError, ClinicalVisit, FollowUp, Gender, Medicine, NewFollowUp,
    NewPrescription, NewVisit, NonEmptyText, Patient, PatientDetails, PatientId, Prescription,
    PrescriptionUpdate, Role, UserProfile, VisitId, VisitUpdate, Vitals,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Identifier allocated by a create operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedRes {
    pub id: u64,
}

// ----------------------------------------------------------------------------
// Patients
// ----------------------------------------------------------------------------

/// Body of a patient registration or full replacement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientReq {
    pub name: String,
    pub age: u32,
    /// `male`, `female` or `other`.
    pub gender: String,
    pub contact_number: String,
    pub address: String,
    #[serde(default)]
    pub medical_history: Vec<String>,
}

impl TryFrom<PatientReq> for PatientDetails {
    type Error = ClinicError;

    fn try_from(req: PatientReq) -> Result<Self, Self::Error> {
        Ok(PatientDetails {
            name: req.name,
            age: req.age,
            gender: req.gender.parse::<Gender>()?,
            contact_number: req.contact_number,
            address: req.address,
            medical_history: req.medical_history,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDto {
    pub id: u64,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub contact_number: String,
    pub address: String,
    pub medical_history: Vec<String>,
}

impl From<Patient> for PatientDto {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id.0,
            name: p.name,
            age: p.age,
            gender: p.gender.to_string(),
            contact_number: p.contact_number,
            address: p.address,
            medical_history: p.medical_history,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// ----------------------------------------------------------------------------
// Clinical visits
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VitalsDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl From<VitalsDto> for Vitals {
    fn from(v: VitalsDto) -> Self {
        Vitals {
            blood_pressure: v.blood_pressure,
            temperature: v.temperature,
            pulse: v.pulse,
            weight: v.weight,
        }
    }
}

impl From<Vitals> for VitalsDto {
    fn from(v: Vitals) -> Self {
        Self {
            blood_pressure: v.blood_pressure,
            temperature: v.temperature,
            pulse: v.pulse,
            weight: v.weight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVisitReq {
    pub patient_id: u64,
    pub date: i64,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub diagnosis: String,
    #[serde(default)]
    pub treatment_plan: Vec<String>,
    #[serde(default)]
    pub vitals: VitalsDto,
}

impl From<NewVisitReq> for NewVisit {
    fn from(req: NewVisitReq) -> Self {
        NewVisit {
            patient_id: PatientId(req.patient_id),
            date: req.date,
            symptoms: req.symptoms,
            diagnosis: req.diagnosis,
            treatment_plan: req.treatment_plan,
            vitals: req.vitals.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitUpdateReq {
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub diagnosis: String,
    #[serde(default)]
    pub treatment_plan: Vec<String>,
    #[serde(default)]
    pub vitals: VitalsDto,
}

impl From<VisitUpdateReq> for VisitUpdate {
    fn from(req: VisitUpdateReq) -> Self {
        VisitUpdate {
            symptoms: req.symptoms,
            diagnosis: req.diagnosis,
            treatment_plan: req.treatment_plan,
            vitals: req.vitals.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitDto {
    pub id: u64,
    pub patient_id: u64,
    pub date: i64,
    pub symptoms: Vec<String>,
    pub diagnosis: String,
    pub treatment_plan: Vec<String>,
    pub vitals: VitalsDto,
}

impl From<ClinicalVisit> for VisitDto {
    fn from(v: ClinicalVisit) -> Self {
        Self {
            id: v.id.0,
            patient_id: v.patient_id.0,
            date: v.date,
            symptoms: v.symptoms,
            diagnosis: v.diagnosis,
            treatment_plan: v.treatment_plan,
            vitals: v.vitals.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Follow-ups
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewFollowUpReq {
    pub patient_id: u64,
    pub appointment_date: i64,
    #[serde(default)]
    pub notes: String,
}

impl From<NewFollowUpReq> for NewFollowUp {
    fn from(req: NewFollowUpReq) -> Self {
        NewFollowUp {
            patient_id: PatientId(req.patient_id),
            appointment_date: req.appointment_date,
            notes: req.notes,
        }
    }
}

/// A follow-up as clients see it. `completed` mirrors `status == "completed"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpDto {
    pub id: u64,
    pub patient_id: u64,
    pub appointment_date: i64,
    pub notes: String,
    pub completed: bool,
    /// `scheduled`, `completed` or `cancelled`.
    pub status: String,
}

impl From<FollowUp> for FollowUpDto {
    fn from(f: FollowUp) -> Self {
        Self {
            id: f.id.0,
            patient_id: f.patient_id.0,
            appointment_date: f.appointment_date,
            completed: f.is_completed(),
            status: f.status.to_string(),
            notes: f.notes,
        }
    }
}

// ----------------------------------------------------------------------------
// Prescriptions
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MedicineDto {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

impl From<MedicineDto> for Medicine {
    fn from(m: MedicineDto) -> Self {
        Medicine {
            name: m.name,
            dosage: m.dosage,
            frequency: m.frequency,
            duration: m.duration,
        }
    }
}

impl From<Medicine> for MedicineDto {
    fn from(m: Medicine) -> Self {
        Self {
            name: m.name,
            dosage: m.dosage,
            frequency: m.frequency,
            duration: m.duration,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescriptionReq {
    pub patient_id: u64,
    pub visit_id: u64,
    pub medicines: Vec<MedicineDto>,
    pub doctor_name: String,
    pub date: i64,
}

impl From<NewPrescriptionReq> for NewPrescription {
    fn from(req: NewPrescriptionReq) -> Self {
        NewPrescription {
            patient_id: PatientId(req.patient_id),
            visit_id: VisitId(req.visit_id),
            medicines: req.medicines.into_iter().map(Medicine::from).collect(),
            doctor_name: req.doctor_name,
            date: req.date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionUpdateReq {
    pub medicines: Vec<MedicineDto>,
    pub doctor_name: String,
}

impl From<PrescriptionUpdateReq> for PrescriptionUpdate {
    fn from(req: PrescriptionUpdateReq) -> Self {
        PrescriptionUpdate {
            medicines: req.medicines.into_iter().map(Medicine::from).collect(),
            doctor_name: req.doctor_name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionDto {
    pub id: u64,
    pub patient_id: u64,
    pub visit_id: u64,
    pub medicines: Vec<MedicineDto>,
    pub doctor_name: String,
    pub date: i64,
}

impl From<Prescription> for PrescriptionDto {
    fn from(p: Prescription) -> Self {
        Self {
            id: p.id.0,
            patient_id: p.patient_id.0,
            visit_id: p.visit_id.0,
            medicines: p.medicines.into_iter().map(MedicineDto::from).collect(),
            doctor_name: p.doctor_name,
            date: p.date,
        }
    }
}

// ----------------------------------------------------------------------------
// Identity
// ----------------------------------------------------------------------------

/// A caller's self-described profile.
///
/// `role` is the caller's job title (for example "Doctor"), not their access role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfileDto {
    pub name: String,
    pub role: String,
}

impl TryFrom<UserProfileDto> for UserProfile {
    type Error = ClinicError;

    fn try_from(dto: UserProfileDto) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            name: NonEmptyText::new(dto.name)?,
            job_title: dto.role,
        })
    }
}

impl From<UserProfile> for UserProfileDto {
    fn from(p: UserProfile) -> Self {
        Self {
            name: p.name.to_string(),
            role: p.job_title,
        }
    }
}

/// Access role: `guest`, `user` or `admin`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleDto {
    pub role: String,
}

impl From<Role> for RoleDto {
    fn from(role: Role) -> Self {
        Self {
            role: role.to_string(),
        }
    }
}

impl TryFrom<RoleDto> for Role {
    type Error = ClinicError;

    fn try_from(dto: RoleDto) -> Result<Self, Self::Error> {
        dto.role.parse()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IsAdminRes {
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use opd_core::{FollowUpId, FollowUpStatus};

    #[test]
    fn test_patient_req_parses_gender_case_insensitively() {
        let req = PatientReq {
            name: "Asha".into(),
            age: 34,
            gender: "Female".into(),
            contact_number: "555-1".into(),
            address: "X".into(),
            medical_history: vec![],
        };
        let details = PatientDetails::try_from(req).expect("valid gender");
        assert_eq!(details.gender, Gender::Female);
    }

    #[test]
    fn test_patient_req_rejects_unknown_gender() {
        let req: PatientReq = serde_json::from_value(serde_json::json!({
            "name": "Asha",
            "age": 34,
            "gender": "robot",
            "contactNumber": "555-1",
            "address": "X"
        }))
        .expect("request should deserialize");

        let err = PatientDetails::try_from(req).expect_err("unknown gender");
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn test_follow_up_dto_reports_completed_flag() {
        let follow_up = FollowUp {
            id: FollowUpId(4),
            patient_id: PatientId(1),
            appointment_date: 10,
            notes: "review".into(),
            status: FollowUpStatus::Completed,
        };

        let json = serde_json::to_value(FollowUpDto::from(follow_up)).expect("serialize");
        assert_eq!(json["completed"], true);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["patientId"], 1);
        assert_eq!(json["appointmentDate"], 10);
    }

    #[test]
    fn test_visit_request_defaults_missing_vitals() {
        let req: NewVisitReq = serde_json::from_value(serde_json::json!({
            "patientId": 1,
            "date": 5,
            "diagnosis": "flu"
        }))
        .expect("request should deserialize");

        let visit = NewVisit::from(req);
        assert!(visit.vitals.is_empty());
        assert!(visit.symptoms.is_empty());
    }

    #[test]
    fn test_profile_role_is_job_title() {
        let profile = UserProfile::try_from(UserProfileDto {
            name: " Dr. Iyer ".into(),
            role: "Doctor".into(),
        })
        .expect("valid profile");
        assert_eq!(profile.name.as_str(), "Dr. Iyer");
        assert_eq!(profile.job_title, "Doctor");

        let err = UserProfile::try_from(UserProfileDto {
            name: "  ".into(),
            role: "Doctor".into(),
        })
        .expect_err("blank name");
        assert!(matches!(err, ClinicError::Text(_)));
    }

    #[test]
    fn test_role_dto_parses_access_role() {
        let role = Role::try_from(RoleDto {
            role: "Admin".into(),
        })
        .expect("valid role");
        assert_eq!(role, Role::Admin);
        assert!(Role::try_from(RoleDto {
            role: "superuser".into()
        })
        .is_err());
    }
}
