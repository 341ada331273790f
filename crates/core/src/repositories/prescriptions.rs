//! Prescriptions issued against a clinical visit.

use super::shared::{Collection, PatientOwned, Record};
use crate::error::{ClinicError, ClinicResult};
use crate::ids::{PatientId, PrescriptionId, Timestamp, VisitId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: PrescriptionId,
    pub patient_id: PatientId,
    pub visit_id: VisitId,
    pub doctor_name: String,
    pub date: Timestamp,
    pub medicines: Vec<Medicine>,
}

impl Record for Prescription {
    type Id = PrescriptionId;

    fn id(&self) -> PrescriptionId {
        self.id
    }
}

impl PatientOwned for Prescription {
    fn patient_id(&self) -> PatientId {
        self.patient_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescription {
    pub patient_id: PatientId,
    pub visit_id: VisitId,
    pub medicines: Vec<Medicine>,
    pub doctor_name: String,
    pub date: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionUpdate {
    pub medicines: Vec<Medicine>,
    pub doctor_name: String,
}

impl Collection<Prescription> {
    /// Stores a prescription. Both the patient and the visit must already have
    /// been checked against each other.
    pub(crate) fn issue(&mut self, new: NewPrescription) -> ClinicResult<PrescriptionId> {
        self.insert_with(|id| Prescription {
            id,
            patient_id: new.patient_id,
            visit_id: new.visit_id,
            doctor_name: new.doctor_name,
            date: new.date,
            medicines: new.medicines,
        })
    }

    /// # Errors
    ///
    /// Returns [`ClinicError::PrescriptionNotFound`] if `id` does not exist.
    pub fn revise(&mut self, id: PrescriptionId, update: PrescriptionUpdate) -> ClinicResult<()> {
        let prescription = self
            .get_mut(id)
            .ok_or(ClinicError::PrescriptionNotFound(id))?;
        prescription.medicines = update.medicines;
        prescription.doctor_name = update.doctor_name;
        Ok(())
    }

    /// Prescriptions of one patient, newest first.
    pub fn for_patient(&self, patient_id: PatientId) -> Vec<Prescription> {
        let mut prescriptions: Vec<Prescription> = self.owned_by(patient_id).cloned().collect();
        prescriptions.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        prescriptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(name: &str) -> Medicine {
        Medicine {
            name: name.into(),
            dosage: "500mg".into(),
            frequency: "twice daily".into(),
            duration: "5 days".into(),
        }
    }

    #[test]
    fn test_revise_only_touches_medicines_and_doctor() {
        let mut prescriptions = Collection::new();
        let id = prescriptions
            .issue(NewPrescription {
                patient_id: PatientId(1),
                visit_id: VisitId(2),
                medicines: vec![medicine("amoxicillin")],
                doctor_name: "Dr. Iyer".into(),
                date: 5,
            })
            .expect("issue should succeed");

        prescriptions
            .revise(
                id,
                PrescriptionUpdate {
                    medicines: vec![medicine("azithromycin"), medicine("paracetamol")],
                    doctor_name: "Dr. Menon".into(),
                },
            )
            .expect("revise should succeed");

        let stored = prescriptions.get(id).expect("exists");
        assert_eq!(stored.patient_id, PatientId(1));
        assert_eq!(stored.visit_id, VisitId(2));
        assert_eq!(stored.date, 5);
        assert_eq!(stored.doctor_name, "Dr. Menon");
        assert_eq!(stored.medicines[0].name, "azithromycin");
        assert_eq!(stored.medicines[1].name, "paracetamol");
    }

    #[test]
    fn test_revise_unknown_prescription() {
        let mut prescriptions: Collection<Prescription> = Collection::new();
        let err = prescriptions
            .revise(
                PrescriptionId(1),
                PrescriptionUpdate {
                    medicines: vec![],
                    doctor_name: String::new(),
                },
            )
            .expect_err("unknown prescription should fail");
        assert!(matches!(err, ClinicError::PrescriptionNotFound(PrescriptionId(1))));
    }
}
