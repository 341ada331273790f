//! Follow-up appointments and their lifecycle.
//!
//! ```text
//! Scheduled --complete--> Completed
//! Scheduled --cancel----> Cancelled
//! ```
//!
//! Both transitions are idempotent on their own target state; crossing from one
//! terminal state to the other is refused. Cancelled follow-ups stay in the
//! collection as tombstones so they remain retrievable by id, but they are left
//! out of every listing.
//!
//! "Upcoming" and "past" are views computed against the clock at read time:
//! upcoming is scheduled with an appointment strictly after `now`; past is every
//! other non-cancelled follow-up.

use super::shared::{Collection, PatientOwned, Record};
use crate::error::{ClinicError, ClinicResult};
use crate::ids::{FollowUpId, PatientId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowUpStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl FollowUpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FollowUpStatus::Scheduled => "scheduled",
            FollowUpStatus::Completed => "completed",
            FollowUpStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FollowUpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub id: FollowUpId,
    pub patient_id: PatientId,
    pub appointment_date: Timestamp,
    pub notes: String,
    pub status: FollowUpStatus,
}

impl FollowUp {
    pub fn is_completed(&self) -> bool {
        self.status == FollowUpStatus::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == FollowUpStatus::Cancelled
    }

    pub fn is_upcoming(&self, now: Timestamp) -> bool {
        self.status == FollowUpStatus::Scheduled && self.appointment_date > now
    }

    pub fn is_past(&self, now: Timestamp) -> bool {
        !self.is_cancelled() && !self.is_upcoming(now)
    }

    fn transition(&mut self, to: FollowUpStatus) -> ClinicResult<bool> {
        match (self.status, to) {
            (from, to) if from == to => Ok(false),
            (FollowUpStatus::Scheduled, FollowUpStatus::Completed)
            | (FollowUpStatus::Scheduled, FollowUpStatus::Cancelled) => {
                self.status = to;
                Ok(true)
            }
            (from, to) => Err(ClinicError::FollowUpTransition {
                id: self.id,
                from,
                to,
            }),
        }
    }
}

impl Record for FollowUp {
    type Id = FollowUpId;

    fn id(&self) -> FollowUpId {
        self.id
    }
}

impl PatientOwned for FollowUp {
    fn patient_id(&self) -> PatientId {
        self.patient_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFollowUp {
    pub patient_id: PatientId,
    pub appointment_date: Timestamp,
    pub notes: String,
}

impl Collection<FollowUp> {
    /// Stores a scheduled follow-up. The caller must already have confirmed that the patient exists.
    pub(crate) fn schedule(&mut self, new: NewFollowUp) -> ClinicResult<FollowUpId> {
        self.insert_with(|id| FollowUp {
            id,
            patient_id: new.patient_id,
            appointment_date: new.appointment_date,
            notes: new.notes,
            status: FollowUpStatus::Scheduled,
        })
    }

    /// Moves a follow-up to `to`, returning whether its status changed.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::FollowUpNotFound`] if `id` does not exist.
    /// - [`ClinicError::FollowUpTransition`] when leaving a terminal state.
    pub fn transition(&mut self, id: FollowUpId, to: FollowUpStatus) -> ClinicResult<bool> {
        self.get_mut(id)
            .ok_or(ClinicError::FollowUpNotFound(id))?
            .transition(to)
    }

    /// Every follow-up that has not been cancelled, ascending id.
    pub fn active(&self) -> Vec<FollowUp> {
        self.iter().filter(|f| !f.is_cancelled()).cloned().collect()
    }

    /// Scheduled follow-ups after `now` for one patient, soonest first.
    pub fn upcoming_for(&self, patient_id: PatientId, now: Timestamp) -> Vec<FollowUp> {
        let mut upcoming: Vec<FollowUp> = self
            .owned_by(patient_id)
            .filter(|f| f.is_upcoming(now))
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| a.appointment_date.cmp(&b.appointment_date).then(a.id.cmp(&b.id)));
        upcoming
    }

    /// Completed or overdue follow-ups for one patient, most recent first.
    pub fn past_for(&self, patient_id: PatientId, now: Timestamp) -> Vec<FollowUp> {
        let mut past: Vec<FollowUp> = self
            .owned_by(patient_id)
            .filter(|f| f.is_past(now))
            .cloned()
            .collect();
        past.sort_by(|a, b| b.appointment_date.cmp(&a.appointment_date).then(a.id.cmp(&b.id)));
        past
    }
}
