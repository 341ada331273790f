//! Patient registration and demographics.
//!
//! A patient is created by registration and afterwards only ever replaced in
//! place: an update swaps every mutable field but keeps the identifier.
//! Patients are never deleted.

use super::shared::{Collection, Record};
use crate::error::{ClinicError, ClinicResult};
use crate::ids::PatientId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(ClinicError::InvalidInput(format!("unknown gender: {other}"))),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub contact_number: String,
    pub address: String,
    /// Free-text notes in the order the caller supplied them.
    pub medical_history: Vec<String>,
}

impl Record for Patient {
    type Id = PatientId;

    fn id(&self) -> PatientId {
        self.id
    }
}

/// Mutable patient fields, used both for registration and full replacement.
///
/// Nothing is validated beyond the types: an empty name is stored as given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub contact_number: String,
    pub address: String,
    pub medical_history: Vec<String>,
}

impl PatientDetails {
    fn into_patient(self, id: PatientId) -> Patient {
        Patient {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            contact_number: self.contact_number,
            address: self.address,
            medical_history: self.medical_history,
        }
    }
}

impl Collection<Patient> {
    pub fn register(&mut self, details: PatientDetails) -> ClinicResult<PatientId> {
        self.insert_with(|id| details.into_patient(id))
    }

    /// Replaces every mutable field of an existing patient.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::PatientNotFound`] if `id` is not registered.
    pub fn replace_details(&mut self, id: PatientId, details: PatientDetails) -> ClinicResult<()> {
        let patient = self.get_mut(id).ok_or(ClinicError::PatientNotFound(id))?;
        *patient = details.into_patient(id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_details(name: &str, contact: &str) -> PatientDetails {
    PatientDetails {
        name: name.to_string(),
        age: 42,
        gender: Gender::Other,
        contact_number: contact.to_string(),
        address: "12 Ward Road".to_string(),
        medical_history: vec![],
    }
}
