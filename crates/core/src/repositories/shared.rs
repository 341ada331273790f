//! Keyed record collection shared by every entity type.
//!
//! A [`Collection`] owns the records of one entity type together with that
//! type's identifier allocator. Records are kept in a `BTreeMap` keyed by id,
//! so listings come out in ascending id order.
//!
//! The allocator only ever moves forward: identifiers handed out once are never
//! handed out again, even if a record is later cancelled or dropped from a
//! snapshot.

use crate::error::{ClinicError, ClinicResult};
use crate::ids::{PatientId, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A record stored in a [`Collection`].
pub trait Record: Clone {
    type Id: RecordId;

    fn id(&self) -> Self::Id;
}

/// A record that hangs off a patient.
pub trait PatientOwned {
    fn patient_id(&self) -> PatientId;
}

/// First identifier handed out by a fresh collection. Zero is never allocated.
pub const FIRST_ID: u64 = 1;

#[derive(Clone, Debug)]
pub struct Collection<T: Record> {
    next_id: u64,
    records: BTreeMap<T::Id, T>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            next_id: FIRST_ID,
            records: BTreeMap::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next identifier and stores the record built for it.
    ///
    /// The builder runs only after allocation has succeeded, so a failed insert
    /// leaves the collection untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::IdSpaceExhausted`] once `u64::MAX` has been handed out.
    pub fn insert_with(&mut self, build: impl FnOnce(T::Id) -> T) -> ClinicResult<T::Id> {
        let raw = self.next_id;
        let next = raw
            .checked_add(1)
            .ok_or(ClinicError::IdSpaceExhausted(T::Id::COLLECTION))?;

        let id = T::Id::from_raw(raw);
        let record = build(id);
        debug_assert_eq!(record.id(), id);

        self.records.insert(id, record);
        self.next_id = next;
        Ok(id)
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.records.get_mut(&id)
    }

    /// Drops a record. The allocator keeps its position, so `id` is not handed out again.
    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        self.records.remove(&id)
    }

    /// Puts a record back under its own id, replacing whatever is stored there.
    ///
    /// Only identifiers this collection has already allocated are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::InvalidInput`] if the record's id is at or beyond
    /// the allocator position.
    pub fn restore(&mut self, record: T) -> ClinicResult<()> {
        let id = record.id();
        if id.raw() >= self.next_id {
            return Err(ClinicError::InvalidInput(format!(
                "{} record {id} was never allocated",
                T::Id::COLLECTION
            )));
        }
        self.records.insert(id, record);
        Ok(())
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.records.contains_key(&id)
    }

    /// Iterates over every record in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }

    /// Clones every record in ascending id order.
    pub fn list_all(&self) -> Vec<T> {
        self.records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The identifier the next insert will receive.
    pub fn next_id(&self) -> T::Id {
        T::Id::from_raw(self.next_id)
    }

    pub fn to_snapshot(&self) -> CollectionSnapshot<T> {
        CollectionSnapshot {
            next_id: self.next_id,
            records: self.list_all(),
        }
    }

    /// Rebuilds a collection from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::InvalidInput`] if two records share an id or if a
    /// record id is not below the stored allocator position.
    pub fn from_snapshot(snapshot: CollectionSnapshot<T>) -> ClinicResult<Self> {
        let mut records = BTreeMap::new();
        for record in snapshot.records {
            let id = record.id();
            if id.raw() >= snapshot.next_id {
                return Err(ClinicError::InvalidInput(format!(
                    "{} record {id} is not below allocator position {}",
                    T::Id::COLLECTION,
                    snapshot.next_id
                )));
            }
            if records.insert(id, record).is_some() {
                return Err(ClinicError::InvalidInput(format!(
                    "duplicate {} record {id}",
                    T::Id::COLLECTION
                )));
            }
        }

        Ok(Self {
            next_id: snapshot.next_id.max(FIRST_ID),
            records,
        })
    }
}

impl<T: Record + PatientOwned> Collection<T> {
    /// Records belonging to `patient_id`, in ascending id order.
    pub fn owned_by(&self, patient_id: PatientId) -> impl Iterator<Item = &T> {
        self.records
            .values()
            .filter(move |record| record.patient_id() == patient_id)
    }
}

/// Serialised form of a [`Collection`], including its allocator position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionSnapshot<T> {
    pub next_id: u64,
    pub records: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: PatientId,
        text: String,
    }

    impl Record for Note {
        type Id = PatientId;

        fn id(&self) -> PatientId {
            self.id
        }
    }

    fn insert_note(collection: &mut Collection<Note>, text: &str) -> PatientId {
        collection
            .insert_with(|id| Note {
                id,
                text: text.to_string(),
            })
            .expect("insert should succeed")
    }

    #[test]
    fn test_insert_allocates_increasing_ids_from_one() {
        let mut notes = Collection::new();
        let ids: Vec<PatientId> = (0..5).map(|i| insert_note(&mut notes, &i.to_string())).collect();

        assert_eq!(ids.first(), Some(&PatientId(FIRST_ID)));
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids must increase");
        assert_eq!(notes.len(), 5);
    }

    #[test]
    fn test_insert_fails_cleanly_when_id_space_exhausted() {
        let mut notes = Collection::from_snapshot(CollectionSnapshot {
            next_id: u64::MAX,
            records: vec![],
        })
        .expect("snapshot should load");

        let err = notes
            .insert_with(|id| Note {
                id,
                text: "overflow".into(),
            })
            .expect_err("last id cannot be allocated");

        assert!(matches!(err, ClinicError::IdSpaceExhausted("patients")));
        assert!(notes.is_empty(), "failed insert must not store anything");
    }

    #[test]
    fn test_snapshot_preserves_allocator_position() {
        let mut notes = Collection::new();
        insert_note(&mut notes, "a");
        insert_note(&mut notes, "b");

        let mut snapshot = notes.to_snapshot();
        // Dropping a record must not let its id come back.
        snapshot.records.retain(|n| n.text != "b");

        let mut restored = Collection::from_snapshot(snapshot).expect("snapshot should load");
        let id = insert_note(&mut restored, "c");
        assert_eq!(id, PatientId(3));
    }

    #[test]
    fn test_remove_keeps_allocator_position() {
        let mut notes = Collection::new();
        insert_note(&mut notes, "a");
        let dropped = insert_note(&mut notes, "b");

        let removed = notes.remove(dropped).expect("record exists");
        assert_eq!(removed.text, "b");
        assert!(!notes.contains(dropped));

        assert_eq!(insert_note(&mut notes, "c"), PatientId(3));
    }

    #[test]
    fn test_restore_puts_previous_record_back() {
        let mut notes = Collection::new();
        let id = insert_note(&mut notes, "before");
        let previous = notes.get(id).cloned().expect("record exists");
        notes.get_mut(id).expect("record exists").text = "after".into();

        notes.restore(previous).expect("restore should succeed");
        assert_eq!(notes.get(id).map(|n| n.text.as_str()), Some("before"));

        let err = notes
            .restore(Note {
                id: PatientId(9),
                text: "never allocated".into(),
            })
            .expect_err("unallocated id should be rejected");
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn test_from_snapshot_rejects_duplicate_ids() {
        let note = Note {
            id: PatientId(1),
            text: "dup".into(),
        };
        let err = Collection::from_snapshot(CollectionSnapshot {
            next_id: 2,
            records: vec![note.clone(), note],
        })
        .expect_err("duplicates should be rejected");

        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn test_from_snapshot_rejects_ids_beyond_allocator() {
        let err = Collection::from_snapshot(CollectionSnapshot {
            next_id: 2,
            records: vec![Note {
                id: PatientId(7),
                text: "ahead".into(),
            }],
        })
        .expect_err("id beyond allocator should be rejected");

        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }
}
