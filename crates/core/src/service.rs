//! Clinic service facade.
//!
//! Every public operation takes the calling [`Principal`] first, checks its role
//! against the operation's minimum, and then runs against the [`ClinicStore`]:
//!
//! | Operations | Minimum role |
//! |---|---|
//! | reads, searches, own profile/role lookups | guest |
//! | patient, visit, follow-up and prescription mutations | user |
//! | `assign_caller_user_role` | admin |
//!
//! Relational reads (`get_clinical_history`, `get_prescriptions_by_patient`,
//! `get_upcoming_follow_ups`, `get_past_follow_ups`) return an empty list for an
//! unknown patient; only writes enforce referential integrity.
//!
//! With a snapshot file configured, mutations run one at a time and the full
//! store is written before the mutation is acknowledged. If that write fails the
//! in-memory change is reverted and the error is returned to the caller.
//! Allocators are not rewound, so the identifier of a failed insert is skipped
//! rather than handed to a later record.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::error::{ClinicError, ClinicResult};
use crate::identity::{Role, UserProfile};
use crate::ids::{FollowUpId, PatientId, PrescriptionId, VisitId};
use crate::integrity;
use crate::persistence::SnapshotFile;
use crate::repositories::follow_ups::{FollowUp, FollowUpStatus, NewFollowUp};
use crate::repositories::patients::{Patient, PatientDetails};
use crate::repositories::prescriptions::{NewPrescription, Prescription, PrescriptionUpdate};
use crate::repositories::visits::{ClinicalVisit, NewVisit, VisitUpdate};
use crate::search::{search_patients, SearchField};
use crate::store::ClinicStore;
use opd_types::Principal;
use std::sync::{Arc, Mutex};

/// Reverts an applied mutation whose snapshot could not be written.
type Undo = Box<dyn FnOnce(&ClinicStore) -> ClinicResult<()>>;

fn revert_with(undo: impl FnOnce(&ClinicStore) -> ClinicResult<()> + 'static) -> Option<Undo> {
    Some(Box::new(undo))
}

#[derive(Clone)]
pub struct ClinicService {
    store: Arc<ClinicStore>,
    clock: Arc<dyn Clock>,
    snapshot_file: Option<SnapshotFile>,
    persist_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for ClinicService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClinicService")
            .field("snapshot_file", &self.snapshot_file)
            .finish_non_exhaustive()
    }
}

impl ClinicService {
    /// Opens the service described by `cfg`.
    ///
    /// With a data directory, an existing snapshot is loaded (a missing one means an empty
    /// store). A configured bootstrap admin is granted `admin` if it does not hold it yet.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError` if the snapshot cannot be read or is inconsistent.
    pub fn open(cfg: &CoreConfig, clock: Arc<dyn Clock>) -> ClinicResult<Self> {
        let snapshot_file = cfg.data_dir().map(SnapshotFile::in_dir);

        let mut store = ClinicStore::new();
        if let Some(file) = &snapshot_file {
            if let Some(snapshot) = file.load()? {
                store = ClinicStore::from_snapshot(snapshot)?;
                tracing::info!(path = %file.path().display(), "loaded clinic snapshot");
            }
        }

        let service = Self {
            store: Arc::new(store),
            clock,
            snapshot_file,
            persist_lock: Arc::new(Mutex::new(())),
        };

        if let Some(admin) = cfg.bootstrap_admin() {
            service.bootstrap_admin(admin)?;
        }

        Ok(service)
    }

    /// A service over an empty store that is never written to disk.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(ClinicStore::new()),
            clock,
            snapshot_file: None,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The underlying store, for snapshotting and diagnostics.
    pub fn store(&self) -> &ClinicStore {
        &self.store
    }

    fn bootstrap_admin(&self, admin: &Principal) -> ClinicResult<()> {
        let now = self.clock.now();
        let granted = self.commit(|store| {
            let mut identities = store.write_identities()?;
            if identities.role_of(admin) == Role::Admin {
                return Ok((false, None));
            }
            let previous = identities.account(admin).cloned();
            identities.assign_role(admin, Role::Admin, now)?;
            let principal = admin.clone();
            Ok((
                true,
                revert_with(move |store| {
                    store.write_identities()?.restore_account(&principal, previous);
                    Ok(())
                }),
            ))
        })?;

        if granted {
            tracing::info!(principal = %admin, "granted bootstrap admin");
        }
        Ok(())
    }

    fn authorize(
        &self,
        caller: &Principal,
        minimum: Role,
        operation: &'static str,
    ) -> ClinicResult<Role> {
        let role = self
            .store
            .read_identities()?
            .require_role(caller, minimum)
            .map_err(|e| {
                tracing::warn!(caller = %caller, operation, "refused: {}", e);
                e
            })?;
        tracing::debug!(caller = %caller, role = %role, operation, "authorized");
        Ok(role)
    }

    /// Applies a mutation and, when a snapshot file is configured, writes the
    /// store before returning.
    ///
    /// `apply` returns its result together with the undo for the change it made,
    /// or `None` when it changed nothing. A failed write runs the undo and
    /// returns the write error.
    fn commit<R>(
        &self,
        apply: impl FnOnce(&ClinicStore) -> ClinicResult<(R, Option<Undo>)>,
    ) -> ClinicResult<R> {
        let store: &ClinicStore = &self.store;
        let Some(file) = &self.snapshot_file else {
            return apply(store).map(|(result, _)| result);
        };

        let _guard = self
            .persist_lock
            .lock()
            .map_err(|_| ClinicError::LockPoisoned("persistence"))?;

        let (result, undo) = apply(store)?;
        let Some(undo) = undo else {
            return Ok(result);
        };

        let saved = store.snapshot().and_then(|snapshot| file.save(&snapshot));
        if let Err(e) = saved {
            tracing::error!(path = %file.path().display(), "failed to persist clinic snapshot: {}", e);
            if let Err(undo_err) = undo(store) {
                tracing::error!("failed to revert unsaved change: {}", undo_err);
            }
            return Err(e);
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    pub fn register_patient(
        &self,
        caller: &Principal,
        details: PatientDetails,
    ) -> ClinicResult<PatientId> {
        self.authorize(caller, Role::User, "register_patient")?;

        let id = self.commit(|store| {
            let id = store.write_patients()?.register(details)?;
            Ok((
                id,
                revert_with(move |store| {
                    store.write_patients()?.remove(id);
                    Ok(())
                }),
            ))
        })?;

        tracing::info!(caller = %caller, patient_id = %id, "registered patient");
        Ok(id)
    }

    /// Replaces every mutable field of a patient.
    pub fn update_patient(
        &self,
        caller: &Principal,
        id: PatientId,
        details: PatientDetails,
    ) -> ClinicResult<()> {
        self.authorize(caller, Role::User, "update_patient")?;

        self.commit(|store| {
            let mut patients = store.write_patients()?;
            let previous = patients
                .get(id)
                .cloned()
                .ok_or(ClinicError::PatientNotFound(id))?;
            patients.replace_details(id, details)?;
            Ok((
                (),
                revert_with(move |store| store.write_patients()?.restore(previous)),
            ))
        })?;

        tracing::info!(caller = %caller, patient_id = %id, "updated patient");
        Ok(())
    }

    pub fn get_all_patients(&self, caller: &Principal) -> ClinicResult<Vec<Patient>> {
        self.authorize(caller, Role::Guest, "get_all_patients")?;
        Ok(self.store.read_patients()?.list_all())
    }

    pub fn get_patient_by_id(
        &self,
        caller: &Principal,
        id: PatientId,
    ) -> ClinicResult<Option<Patient>> {
        self.authorize(caller, Role::Guest, "get_patient_by_id")?;
        Ok(self.store.read_patients()?.get(id).cloned())
    }

    pub fn search_patients_by_name(
        &self,
        caller: &Principal,
        term: &str,
    ) -> ClinicResult<Vec<Patient>> {
        self.authorize(caller, Role::Guest, "search_patients_by_name")?;
        let patients = self.store.read_patients()?;
        Ok(search_patients(&patients, SearchField::Name, term))
    }

    pub fn search_patients_by_contact(
        &self,
        caller: &Principal,
        term: &str,
    ) -> ClinicResult<Vec<Patient>> {
        self.authorize(caller, Role::Guest, "search_patients_by_contact")?;
        let patients = self.store.read_patients()?;
        Ok(search_patients(&patients, SearchField::ContactNumber, term))
    }

    // ------------------------------------------------------------------
    // Clinical visits
    // ------------------------------------------------------------------

    pub fn create_clinical_visit(
        &self,
        caller: &Principal,
        new: NewVisit,
    ) -> ClinicResult<VisitId> {
        self.authorize(caller, Role::User, "create_clinical_visit")?;

        let patient_id = new.patient_id;
        let id = self.commit(|store| {
            let patients = store.read_patients()?;
            integrity::require_patient(&patients, patient_id).map_err(|e| {
                tracing::warn!(caller = %caller, "create_clinical_visit rejected: {}", e);
                e
            })?;
            let id = store.write_visits()?.record_visit(new)?;
            Ok((
                id,
                revert_with(move |store| {
                    store.write_visits()?.remove(id);
                    Ok(())
                }),
            ))
        })?;

        tracing::info!(caller = %caller, visit_id = %id, patient_id = %patient_id, "created clinical visit");
        Ok(id)
    }

    /// Updates the clinical content of a visit; its patient and date never change.
    pub fn update_visit(
        &self,
        caller: &Principal,
        id: VisitId,
        update: VisitUpdate,
    ) -> ClinicResult<()> {
        self.authorize(caller, Role::User, "update_visit")?;

        self.commit(|store| {
            let mut visits = store.write_visits()?;
            let previous = visits
                .get(id)
                .cloned()
                .ok_or(ClinicError::VisitNotFound(id))?;
            visits.amend(id, update)?;
            Ok((
                (),
                revert_with(move |store| store.write_visits()?.restore(previous)),
            ))
        })?;

        tracing::info!(caller = %caller, visit_id = %id, "updated clinical visit");
        Ok(())
    }

    pub fn get_visit_by_id(
        &self,
        caller: &Principal,
        id: VisitId,
    ) -> ClinicResult<Option<ClinicalVisit>> {
        self.authorize(caller, Role::Guest, "get_visit_by_id")?;
        Ok(self.store.read_visits()?.get(id).cloned())
    }

    /// Visits of a patient, newest first. Unknown patients have no history.
    pub fn get_clinical_history(
        &self,
        caller: &Principal,
        patient_id: PatientId,
    ) -> ClinicResult<Vec<ClinicalVisit>> {
        self.authorize(caller, Role::Guest, "get_clinical_history")?;
        Ok(self.store.read_visits()?.history_of(patient_id))
    }

    // ------------------------------------------------------------------
    // Follow-ups
    // ------------------------------------------------------------------

    pub fn schedule_follow_up(
        &self,
        caller: &Principal,
        new: NewFollowUp,
    ) -> ClinicResult<FollowUpId> {
        self.authorize(caller, Role::User, "schedule_follow_up")?;

        let patient_id = new.patient_id;
        let id = self.commit(|store| {
            let patients = store.read_patients()?;
            integrity::require_patient(&patients, patient_id).map_err(|e| {
                tracing::warn!(caller = %caller, "schedule_follow_up rejected: {}", e);
                e
            })?;
            let id = store.write_follow_ups()?.schedule(new)?;
            Ok((
                id,
                revert_with(move |store| {
                    store.write_follow_ups()?.remove(id);
                    Ok(())
                }),
            ))
        })?;

        tracing::info!(caller = %caller, follow_up_id = %id, patient_id = %patient_id, "scheduled follow-up");
        Ok(id)
    }

    /// Marks a follow-up completed. Completing it again is a no-op.
    pub fn mark_follow_up_completed(&self, caller: &Principal, id: FollowUpId) -> ClinicResult<()> {
        self.transition_follow_up(caller, id, FollowUpStatus::Completed, "mark_follow_up_completed")
    }

    /// Cancels a follow-up, keeping it retrievable by id. Cancelling it again is a no-op.
    pub fn cancel_follow_up(&self, caller: &Principal, id: FollowUpId) -> ClinicResult<()> {
        self.transition_follow_up(caller, id, FollowUpStatus::Cancelled, "cancel_follow_up")
    }

    fn transition_follow_up(
        &self,
        caller: &Principal,
        id: FollowUpId,
        to: FollowUpStatus,
        operation: &'static str,
    ) -> ClinicResult<()> {
        self.authorize(caller, Role::User, operation)?;

        let changed = self.commit(|store| {
            let mut follow_ups = store.write_follow_ups()?;
            let previous = follow_ups
                .get(id)
                .cloned()
                .ok_or(ClinicError::FollowUpNotFound(id))?;
            if !follow_ups.transition(id, to)? {
                return Ok((false, None));
            }
            Ok((
                true,
                revert_with(move |store| store.write_follow_ups()?.restore(previous)),
            ))
        })?;

        if changed {
            tracing::info!(caller = %caller, follow_up_id = %id, status = %to, "follow-up status changed");
        } else {
            tracing::debug!(caller = %caller, follow_up_id = %id, status = %to, "follow-up already in status");
        }
        Ok(())
    }

    /// Every follow-up that has not been cancelled.
    pub fn get_all_follow_ups(&self, caller: &Principal) -> ClinicResult<Vec<FollowUp>> {
        self.authorize(caller, Role::Guest, "get_all_follow_ups")?;
        Ok(self.store.read_follow_ups()?.active())
    }

    /// A follow-up by id, including cancelled ones.
    pub fn get_follow_up_by_id(
        &self,
        caller: &Principal,
        id: FollowUpId,
    ) -> ClinicResult<Option<FollowUp>> {
        self.authorize(caller, Role::Guest, "get_follow_up_by_id")?;
        Ok(self.store.read_follow_ups()?.get(id).cloned())
    }

    /// Scheduled follow-ups after the current server time, soonest first.
    pub fn get_upcoming_follow_ups(
        &self,
        caller: &Principal,
        patient_id: PatientId,
    ) -> ClinicResult<Vec<FollowUp>> {
        self.authorize(caller, Role::Guest, "get_upcoming_follow_ups")?;
        let now = self.clock.now();
        Ok(self.store.read_follow_ups()?.upcoming_for(patient_id, now))
    }

    /// Completed or overdue follow-ups, most recent first.
    pub fn get_past_follow_ups(
        &self,
        caller: &Principal,
        patient_id: PatientId,
    ) -> ClinicResult<Vec<FollowUp>> {
        self.authorize(caller, Role::Guest, "get_past_follow_ups")?;
        let now = self.clock.now();
        Ok(self.store.read_follow_ups()?.past_for(patient_id, now))
    }

    // ------------------------------------------------------------------
    // Prescriptions
    // ------------------------------------------------------------------

    /// Issues a prescription for a visit of the same patient.
    ///
    /// The patient and visit collections stay read-locked until the prescription
    /// has been stored.
    pub fn create_prescription(
        &self,
        caller: &Principal,
        new: NewPrescription,
    ) -> ClinicResult<PrescriptionId> {
        self.authorize(caller, Role::User, "create_prescription")?;

        let (patient_id, visit_id) = (new.patient_id, new.visit_id);
        let id = self.commit(|store| {
            let patients = store.read_patients()?;
            let visits = store.read_visits()?;
            integrity::require_visit_of_patient(&patients, &visits, patient_id, visit_id)
                .map_err(|e| {
                    tracing::warn!(caller = %caller, "create_prescription rejected: {}", e);
                    e
                })?;
            let id = store.write_prescriptions()?.issue(new)?;
            Ok((
                id,
                revert_with(move |store| {
                    store.write_prescriptions()?.remove(id);
                    Ok(())
                }),
            ))
        })?;

        tracing::info!(
            caller = %caller,
            prescription_id = %id,
            patient_id = %patient_id,
            visit_id = %visit_id,
            "created prescription"
        );
        Ok(id)
    }

    /// Replaces the medicines and prescribing doctor of a prescription.
    pub fn update_prescription(
        &self,
        caller: &Principal,
        id: PrescriptionId,
        update: PrescriptionUpdate,
    ) -> ClinicResult<()> {
        self.authorize(caller, Role::User, "update_prescription")?;

        self.commit(|store| {
            let mut prescriptions = store.write_prescriptions()?;
            let previous = prescriptions
                .get(id)
                .cloned()
                .ok_or(ClinicError::PrescriptionNotFound(id))?;
            prescriptions.revise(id, update)?;
            Ok((
                (),
                revert_with(move |store| store.write_prescriptions()?.restore(previous)),
            ))
        })?;

        tracing::info!(caller = %caller, prescription_id = %id, "updated prescription");
        Ok(())
    }

    pub fn get_prescription_by_id(
        &self,
        caller: &Principal,
        id: PrescriptionId,
    ) -> ClinicResult<Option<Prescription>> {
        self.authorize(caller, Role::Guest, "get_prescription_by_id")?;
        Ok(self.store.read_prescriptions()?.get(id).cloned())
    }

    /// Prescriptions of a patient, newest first. Unknown patients have none.
    pub fn get_prescriptions_by_patient(
        &self,
        caller: &Principal,
        patient_id: PatientId,
    ) -> ClinicResult<Vec<Prescription>> {
        self.authorize(caller, Role::Guest, "get_prescriptions_by_patient")?;
        Ok(self.store.read_prescriptions()?.for_patient(patient_id))
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub fn get_caller_user_profile(&self, caller: &Principal) -> ClinicResult<Option<UserProfile>> {
        Ok(self.store.read_identities()?.profile_of(caller))
    }

    /// Creates or replaces the caller's own profile, registering a guest as a user.
    pub fn save_caller_user_profile(
        &self,
        caller: &Principal,
        profile: UserProfile,
    ) -> ClinicResult<()> {
        let now = self.clock.now();
        let role = self.commit(|store| {
            let mut identities = store.write_identities()?;
            let previous = identities.account(caller).cloned();
            let role = identities.save_profile(caller, profile, now).map_err(|e| {
                tracing::warn!(caller = %caller, "save_caller_user_profile refused: {}", e);
                e
            })?;
            let principal = caller.clone();
            Ok((
                role,
                revert_with(move |store| {
                    store.write_identities()?.restore_account(&principal, previous);
                    Ok(())
                }),
            ))
        })?;

        tracing::info!(caller = %caller, role = %role, "saved user profile");
        Ok(())
    }

    pub fn get_caller_user_role(&self, caller: &Principal) -> ClinicResult<Role> {
        Ok(self.store.read_identities()?.role_of(caller))
    }

    pub fn is_caller_admin(&self, caller: &Principal) -> ClinicResult<bool> {
        Ok(self.get_caller_user_role(caller)? == Role::Admin)
    }

    /// Another principal's profile. Callers may always read their own; anyone
    /// else's requires admin.
    pub fn get_user_profile(
        &self,
        caller: &Principal,
        user: &Principal,
    ) -> ClinicResult<Option<UserProfile>> {
        let identities = self.store.read_identities()?;
        if caller != user {
            identities.require_role(caller, Role::Admin).map_err(|e| {
                tracing::warn!(caller = %caller, user = %user, "get_user_profile refused: {}", e);
                e
            })?;
        }
        Ok(identities.profile_of(user))
    }

    /// Assigns `role` to `user`. Admin only; the last admin cannot be demoted.
    pub fn assign_caller_user_role(
        &self,
        caller: &Principal,
        user: &Principal,
        role: Role,
    ) -> ClinicResult<()> {
        let now = self.clock.now();
        self.commit(|store| {
            let mut identities = store.write_identities()?;
            identities.require_role(caller, Role::Admin).map_err(|e| {
                tracing::warn!(caller = %caller, user = %user, "assign_caller_user_role refused: {}", e);
                e
            })?;
            let previous = identities.account(user).cloned();
            identities.assign_role(user, role, now)?;
            let principal = user.clone();
            Ok((
                (),
                revert_with(move |store| {
                    store.write_identities()?.restore_account(&principal, previous);
                    Ok(())
                }),
            ))
        })?;

        tracing::info!(caller = %caller, user = %user, role = %role, "assigned role");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
