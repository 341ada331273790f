//! Clinical visits.
//!
//! The patient and the visit date are fixed at creation; updates may only touch
//! the clinical content (symptoms, diagnosis, treatment plan, vitals). The date
//! is supplied by the caller so visits can be recorded after the fact.

use super::shared::{Collection, PatientOwned, Record};
use crate::error::{ClinicError, ClinicResult};
use crate::ids::{PatientId, Timestamp, VisitId};
use serde::{Deserialize, Serialize};

/// Vital signs captured at a visit. Each reading is independently optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Vitals {
    pub fn is_empty(&self) -> bool {
        self.blood_pressure.is_none()
            && self.temperature.is_none()
            && self.pulse.is_none()
            && self.weight.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalVisit {
    pub id: VisitId,
    pub patient_id: PatientId,
    pub date: Timestamp,
    pub symptoms: Vec<String>,
    pub diagnosis: String,
    pub treatment_plan: Vec<String>,
    #[serde(default)]
    pub vitals: Vitals,
}

impl Record for ClinicalVisit {
    type Id = VisitId;

    fn id(&self) -> VisitId {
        self.id
    }
}

impl PatientOwned for ClinicalVisit {
    fn patient_id(&self) -> PatientId {
        self.patient_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    pub patient_id: PatientId,
    pub date: Timestamp,
    pub symptoms: Vec<String>,
    pub diagnosis: String,
    pub treatment_plan: Vec<String>,
    #[serde(default)]
    pub vitals: Vitals,
}

/// Clinical content of a visit that may change after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitUpdate {
    pub symptoms: Vec<String>,
    pub diagnosis: String,
    pub treatment_plan: Vec<String>,
    #[serde(default)]
    pub vitals: Vitals,
}

impl Collection<ClinicalVisit> {
    /// Stores a visit. The caller must already have confirmed that the patient exists.
    pub(crate) fn record_visit(&mut self, new: NewVisit) -> ClinicResult<VisitId> {
        self.insert_with(|id| ClinicalVisit {
            id,
            patient_id: new.patient_id,
            date: new.date,
            symptoms: new.symptoms,
            diagnosis: new.diagnosis,
            treatment_plan: new.treatment_plan,
            vitals: new.vitals,
        })
    }

    /// # Errors
    ///
    /// Returns [`ClinicError::VisitNotFound`] if `id` does not exist.
    pub fn amend(&mut self, id: VisitId, update: VisitUpdate) -> ClinicResult<()> {
        let visit = self.get_mut(id).ok_or(ClinicError::VisitNotFound(id))?;
        visit.symptoms = update.symptoms;
        visit.diagnosis = update.diagnosis;
        visit.treatment_plan = update.treatment_plan;
        visit.vitals = update.vitals;
        Ok(())
    }

    /// Visits of one patient, newest first. Visits sharing a date keep id order.
    pub fn history_of(&self, patient_id: PatientId) -> Vec<ClinicalVisit> {
        let mut visits: Vec<ClinicalVisit> = self.owned_by(patient_id).cloned().collect();
        visits.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        visits
    }
}
