//! Patient lookup by name or contact number.
//!
//! Matching is a case-insensitive substring test over the whole patient
//! collection. The empty term matches nothing; any other term, whitespace
//! included, is an ordinary substring.

use crate::repositories::patients::Patient;
use crate::repositories::shared::Collection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchField {
    Name,
    ContactNumber,
}

impl SearchField {
    fn value(self, patient: &Patient) -> &str {
        match self {
            SearchField::Name => &patient.name,
            SearchField::ContactNumber => &patient.contact_number,
        }
    }
}

/// Case-folds `term` once so it can be tested against many haystacks.
#[derive(Clone, Debug)]
struct Needle(String);

impl Needle {
    fn new(term: &str) -> Option<Self> {
        if term.is_empty() {
            return None;
        }
        Some(Self(term.to_lowercase()))
    }

    fn found_in(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.0)
    }
}

/// Patients whose `field` contains `term`, ignoring case, in ascending id order.
pub fn search_patients(patients: &Collection<Patient>, field: SearchField, term: &str) -> Vec<Patient> {
    let Some(needle) = Needle::new(term) else {
        return Vec::new();
    };

    patients
        .iter()
        .filter(|patient| needle.found_in(field.value(patient)))
        .cloned()
        .collect()
}
