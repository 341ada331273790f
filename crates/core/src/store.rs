//! The clinic record store.
//!
//! Four entity collections plus the identity registry, each behind its own
//! `RwLock`. A mutation holds the write lock of the collection it changes for
//! its whole duration, so inserts, updates and identifier allocation are atomic
//! per collection. Readers take the read lock and clone what they return.
//!
//! When an operation needs several locks it takes them in this order:
//!
//! ```text
//! identities -> patients -> visits -> follow_ups -> prescriptions
//! ```
//!
//! Cross-collection writes keep the parent collections read-locked while they
//! write the child, so a referenced record cannot change underneath the check.

use crate::error::{ClinicError, ClinicResult};
use crate::identity::{Account, IdentityRegistry};
use crate::integrity;
use crate::repositories::follow_ups::FollowUp;
use crate::repositories::patients::Patient;
use crate::repositories::prescriptions::Prescription;
use crate::repositories::shared::{Collection, CollectionSnapshot};
use crate::repositories::visits::ClinicalVisit;
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Current on-disk snapshot layout.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default)]
pub struct ClinicStore {
    identities: RwLock<IdentityRegistry>,
    patients: RwLock<Collection<Patient>>,
    visits: RwLock<Collection<ClinicalVisit>>,
    follow_ups: RwLock<Collection<FollowUp>>,
    prescriptions: RwLock<Collection<Prescription>>,
}

macro_rules! lock_accessors {
    ($field:ident, $ty:ty, $read:ident, $write:ident, $label:literal) => {
        pub fn $read(&self) -> ClinicResult<RwLockReadGuard<'_, $ty>> {
            self.$field
                .read()
                .map_err(|_| ClinicError::LockPoisoned($label))
        }

        pub fn $write(&self) -> ClinicResult<RwLockWriteGuard<'_, $ty>> {
            self.$field
                .write()
                .map_err(|_| ClinicError::LockPoisoned($label))
        }
    };
}

impl ClinicStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    lock_accessors!(identities, IdentityRegistry, read_identities, write_identities, "identities");
    lock_accessors!(patients, Collection<Patient>, read_patients, write_patients, "patients");
    lock_accessors!(visits, Collection<ClinicalVisit>, read_visits, write_visits, "clinical visits");
    lock_accessors!(follow_ups, Collection<FollowUp>, read_follow_ups, write_follow_ups, "follow-ups");
    lock_accessors!(
        prescriptions,
        Collection<Prescription>,
        read_prescriptions,
        write_prescriptions,
        "prescriptions"
    );

    /// Point-in-time copy of the whole store.
    ///
    /// All read locks are held together, in lock order, so the snapshot never
    /// contains a child without its parent.
    pub fn snapshot(&self) -> ClinicResult<StoreSnapshot> {
        let identities = self.read_identities()?;
        let patients = self.read_patients()?;
        let visits = self.read_visits()?;
        let follow_ups = self.read_follow_ups()?;
        let prescriptions = self.read_prescriptions()?;

        Ok(StoreSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            accounts: identities.accounts(),
            patients: patients.to_snapshot(),
            visits: visits.to_snapshot(),
            follow_ups: follow_ups.to_snapshot(),
            prescriptions: prescriptions.to_snapshot(),
        })
    }

    /// Rebuilds a store from a snapshot.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::UnsupportedSnapshotVersion`] for an unknown format version.
    /// - [`ClinicError::InvalidInput`] if a collection is internally inconsistent,
    ///   or a record refers to a patient or visit that is not in the snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> ClinicResult<Self> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(ClinicError::UnsupportedSnapshotVersion(
                snapshot.format_version,
            ));
        }

        let patients = Collection::from_snapshot(snapshot.patients)?;
        let visits = Collection::from_snapshot(snapshot.visits)?;
        let follow_ups = Collection::from_snapshot(snapshot.follow_ups)?;
        let prescriptions = Collection::from_snapshot(snapshot.prescriptions)?;
        check_references(&patients, &visits, &follow_ups, &prescriptions)?;

        Ok(Self {
            identities: RwLock::new(IdentityRegistry::from_accounts(snapshot.accounts)),
            patients: RwLock::new(patients),
            visits: RwLock::new(visits),
            follow_ups: RwLock::new(follow_ups),
            prescriptions: RwLock::new(prescriptions),
        })
    }
}

fn check_references(
    patients: &Collection<Patient>,
    visits: &Collection<ClinicalVisit>,
    follow_ups: &Collection<FollowUp>,
    prescriptions: &Collection<Prescription>,
) -> ClinicResult<()> {
    let dangling = |record: String, e: ClinicError| {
        ClinicError::InvalidInput(format!("snapshot {record} has a broken reference: {e}"))
    };

    for visit in visits.iter() {
        integrity::require_patient(patients, visit.patient_id)
            .map_err(|e| dangling(format!("clinical visit {}", visit.id), e))?;
    }
    for follow_up in follow_ups.iter() {
        integrity::require_patient(patients, follow_up.patient_id)
            .map_err(|e| dangling(format!("follow-up {}", follow_up.id), e))?;
    }
    for prescription in prescriptions.iter() {
        integrity::require_visit_of_patient(
            patients,
            visits,
            prescription.patient_id,
            prescription.visit_id,
        )
        .map_err(|e| dangling(format!("prescription {}", prescription.id), e))?;
    }
    Ok(())
}

/// Serialised form of a [`ClinicStore`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub format_version: u32,
    pub accounts: Vec<Account>,
    pub patients: CollectionSnapshot<Patient>,
    pub visits: CollectionSnapshot<ClinicalVisit>,
    pub follow_ups: CollectionSnapshot<FollowUp>,
    pub prescriptions: CollectionSnapshot<Prescription>,
}
