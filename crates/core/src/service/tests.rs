use super::*;
use crate::clock::{FixedClock, NANOS_PER_DAY};
use crate::repositories::patients::Gender;
use crate::repositories::prescriptions::Medicine;
use crate::repositories::visits::Vitals;
use opd_types::NonEmptyText;
use std::collections::HashSet;
use std::thread;
use tempfile::TempDir;

const NOW: i64 = 1_750_000_000_000_000_000;

fn principal(text: &str) -> Principal {
    Principal::parse(text).expect("valid principal")
}

fn admin() -> Principal {
    principal("admin-principal")
}

fn doctor() -> Principal {
    principal("doctor-principal")
}

fn test_cfg(data_dir: Option<&std::path::Path>) -> CoreConfig {
    CoreConfig::new(data_dir.map(|d| d.to_path_buf()), Some(admin()))
        .expect("CoreConfig::new should succeed")
}

/// Service with a bootstrap admin and one registered user (`doctor()`).
fn test_service() -> (ClinicService, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(NOW));
    let service = ClinicService::open(&test_cfg(None), clock.clone()).expect("open should succeed");
    service
        .assign_caller_user_role(&admin(), &doctor(), Role::User)
        .expect("admin can assign roles");
    (service, clock)
}

fn details(name: &str, contact: &str) -> PatientDetails {
    PatientDetails {
        name: name.to_string(),
        age: 30,
        gender: Gender::Female,
        contact_number: contact.to_string(),
        address: "X".to_string(),
        medical_history: vec!["asthma".to_string()],
    }
}

fn visit_for(patient_id: PatientId) -> NewVisit {
    NewVisit {
        patient_id,
        date: NOW - NANOS_PER_DAY,
        symptoms: vec!["cough".into(), "fever".into()],
        diagnosis: "bronchitis".into(),
        treatment_plan: vec!["rest".into(), "fluids".into()],
        vitals: Vitals {
            blood_pressure: Some("120/80".into()),
            temperature: Some(38.1),
            pulse: None,
            weight: Some(61.5),
        },
    }
}

fn medicine(name: &str) -> Medicine {
    Medicine {
        name: name.into(),
        dosage: "1 tablet".into(),
        frequency: "TDS".into(),
        duration: "5 days".into(),
    }
}

fn prescription_for(patient_id: PatientId, visit_id: VisitId) -> NewPrescription {
    NewPrescription {
        patient_id,
        visit_id,
        medicines: vec![medicine("amoxicillin"), medicine("paracetamol")],
        doctor_name: "Dr. Iyer".into(),
        date: NOW,
    }
}

#[test]
fn test_register_then_get_returns_identical_patient() {
    let (service, _) = test_service();
    let input = details("Asha", "555-1");

    let id = service
        .register_patient(&doctor(), input.clone())
        .expect("register should succeed");
    let patient = service
        .get_patient_by_id(&doctor(), id)
        .expect("read should succeed")
        .expect("patient should exist");

    assert_eq!(patient.id, id);
    assert_eq!(patient.name, input.name);
    assert_eq!(patient.age, input.age);
    assert_eq!(patient.gender, input.gender);
    assert_eq!(patient.contact_number, input.contact_number);
    assert_eq!(patient.address, input.address);
    assert_eq!(patient.medical_history, input.medical_history);
}

#[test]
fn test_ids_increase_in_call_order_per_collection() {
    let (service, _) = test_service();

    let patient_ids: Vec<PatientId> = (0..10)
        .map(|i| {
            service
                .register_patient(&doctor(), details(&format!("P{i}"), "0"))
                .expect("register should succeed")
        })
        .collect();
    assert!(patient_ids.windows(2).all(|w| w[0] < w[1]));

    let first_visit = service
        .create_clinical_visit(&doctor(), visit_for(patient_ids[0]))
        .expect("visit should be created");
    assert_eq!(first_visit, VisitId(1), "each collection has its own sequence");
}

#[test]
fn test_concurrent_registrations_get_distinct_ids() {
    let (service, _) = test_service();
    let service = Arc::new(service);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        service
                            .register_patient(&doctor(), details(&format!("T{t}-{i}"), "0"))
                            .expect("register should succeed")
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        let ids = handle.join().expect("thread should not panic");
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "per-thread order is increasing");
        for id in ids {
            assert!(seen.insert(id), "id {id} allocated twice");
        }
    }
    assert_eq!(seen.len(), 200);
    assert_eq!(
        service.get_all_patients(&doctor()).expect("list").len(),
        200
    );
}

#[test]
fn test_unknown_patient_is_rejected_without_partial_writes() {
    let (service, _) = test_service();
    let ghost = PatientId(404);

    let err = service
        .create_clinical_visit(&doctor(), visit_for(ghost))
        .expect_err("visit for unknown patient");
    assert!(matches!(err, ClinicError::PatientNotFound(id) if id == ghost));

    let err = service
        .schedule_follow_up(
            &doctor(),
            NewFollowUp {
                patient_id: ghost,
                appointment_date: NOW + NANOS_PER_DAY,
                notes: "review".into(),
            },
        )
        .expect_err("follow-up for unknown patient");
    assert!(matches!(err, ClinicError::PatientNotFound(_)));

    let err = service
        .create_prescription(&doctor(), prescription_for(ghost, VisitId(1)))
        .expect_err("prescription for unknown patient");
    assert!(matches!(err, ClinicError::PatientNotFound(_)));

    let store = service.store();
    assert!(store.read_visits().expect("lock").is_empty());
    assert!(store.read_follow_ups().expect("lock").is_empty());
    assert!(store.read_prescriptions().expect("lock").is_empty());
}

#[test]
fn test_prescription_for_another_patients_visit_is_rejected() {
    let (service, _) = test_service();
    let asha = service
        .register_patient(&doctor(), details("Asha", "1"))
        .expect("register");
    let ravi = service
        .register_patient(&doctor(), details("Ravi", "2"))
        .expect("register");
    let ashas_visit = service
        .create_clinical_visit(&doctor(), visit_for(asha))
        .expect("visit");

    let err = service
        .create_prescription(&doctor(), prescription_for(ravi, ashas_visit))
        .expect_err("cross-patient prescription");
    assert!(matches!(
        err,
        ClinicError::VisitPatientMismatch { visit_id, visit_patient_id, supplied_patient_id }
            if visit_id == ashas_visit && visit_patient_id == asha && supplied_patient_id == ravi
    ));

    let err = service
        .create_prescription(&doctor(), prescription_for(asha, VisitId(999)))
        .expect_err("unknown visit");
    assert!(matches!(err, ClinicError::VisitNotFound(VisitId(999))));

    assert!(service
        .get_prescriptions_by_patient(&doctor(), ravi)
        .expect("read")
        .is_empty());
    assert!(service.store().read_prescriptions().expect("lock").is_empty());
}

#[test]
fn test_prescription_scenario_preserves_medicine_order() {
    let (service, _) = test_service();
    let p1 = service
        .register_patient(&doctor(), details("Asha", "555-1"))
        .expect("register");
    let v1 = service
        .create_clinical_visit(&doctor(), visit_for(p1))
        .expect("visit");
    let rx = service
        .create_prescription(&doctor(), prescription_for(p1, v1))
        .expect("prescription");

    let prescriptions = service
        .get_prescriptions_by_patient(&doctor(), p1)
        .expect("read");
    assert_eq!(prescriptions.len(), 1);
    assert_eq!(prescriptions[0].id, rx);
    let names: Vec<&str> = prescriptions[0]
        .medicines
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(names, vec!["amoxicillin", "paracetamol"]);
}

#[test]
fn test_update_prescription_and_missing_id() {
    let (service, _) = test_service();
    let p1 = service
        .register_patient(&doctor(), details("Asha", "1"))
        .expect("register");
    let v1 = service
        .create_clinical_visit(&doctor(), visit_for(p1))
        .expect("visit");
    let rx = service
        .create_prescription(&doctor(), prescription_for(p1, v1))
        .expect("prescription");

    service
        .update_prescription(
            &doctor(),
            rx,
            PrescriptionUpdate {
                medicines: vec![medicine("cetirizine")],
                doctor_name: "Dr. Menon".into(),
            },
        )
        .expect("update should succeed");
    let stored = service
        .get_prescription_by_id(&doctor(), rx)
        .expect("read")
        .expect("exists");
    assert_eq!(stored.doctor_name, "Dr. Menon");
    assert_eq!(stored.medicines, vec![medicine("cetirizine")]);
    assert_eq!(stored.visit_id, v1);

    let err = service
        .update_prescription(
            &doctor(),
            PrescriptionId(77),
            PrescriptionUpdate {
                medicines: vec![],
                doctor_name: String::new(),
            },
        )
        .expect_err("unknown prescription");
    assert!(matches!(err, ClinicError::PrescriptionNotFound(PrescriptionId(77))));
}

#[test]
fn test_update_patient_changes_only_target() {
    let (service, _) = test_service();
    let ids: Vec<PatientId> = ["Asha", "Ravi", "Meera"]
        .iter()
        .map(|name| {
            service
                .register_patient(&doctor(), details(name, "0"))
                .expect("register")
        })
        .collect();
    let before = service.get_all_patients(&doctor()).expect("list");

    let mut replacement = details("Ravi Kumar", "080-1");
    replacement.gender = Gender::Male;
    replacement.medical_history = vec![];
    service
        .update_patient(&doctor(), ids[1], replacement)
        .expect("update should succeed");

    let after = service.get_all_patients(&doctor()).expect("list");
    assert_eq!(after.len(), before.len());
    for (old, new) in before.iter().zip(after.iter()) {
        if old.id == ids[1] {
            assert_eq!(new.name, "Ravi Kumar");
            assert_eq!(new.gender, Gender::Male);
            assert!(new.medical_history.is_empty());
        } else {
            assert_eq!(old, new, "untouched patient changed");
        }
    }

    let err = service
        .update_patient(&doctor(), PatientId(50), details("Nobody", "0"))
        .expect_err("unknown patient");
    assert!(matches!(err, ClinicError::PatientNotFound(PatientId(50))));
}

#[test]
fn test_update_visit_keeps_patient_and_date() {
    let (service, _) = test_service();
    let p1 = service
        .register_patient(&doctor(), details("Asha", "1"))
        .expect("register");
    let original = visit_for(p1);
    let v1 = service
        .create_clinical_visit(&doctor(), original.clone())
        .expect("visit");

    service
        .update_visit(
            &doctor(),
            v1,
            VisitUpdate {
                symptoms: vec!["improving".into()],
                diagnosis: "resolving bronchitis".into(),
                treatment_plan: vec![],
                vitals: Vitals::default(),
            },
        )
        .expect("update should succeed");

    let visit = service
        .get_visit_by_id(&doctor(), v1)
        .expect("read")
        .expect("exists");
    assert_eq!(visit.patient_id, p1);
    assert_eq!(visit.date, original.date);
    assert_eq!(visit.diagnosis, "resolving bronchitis");
    assert!(visit.vitals.is_empty());

    let err = service
        .update_visit(
            &doctor(),
            VisitId(9),
            VisitUpdate {
                symptoms: vec![],
                diagnosis: String::new(),
                treatment_plan: vec![],
                vitals: Vitals::default(),
            },
        )
        .expect_err("unknown visit");
    assert!(matches!(err, ClinicError::VisitNotFound(VisitId(9))));
}

#[test]
fn test_relational_reads_are_empty_for_unknown_patients() {
    let (service, _) = test_service();
    let ghost = PatientId(12345);

    assert!(service.get_clinical_history(&doctor(), ghost).expect("read").is_empty());
    assert!(service
        .get_prescriptions_by_patient(&doctor(), ghost)
        .expect("read")
        .is_empty());
    assert!(service
        .get_upcoming_follow_ups(&doctor(), ghost)
        .expect("read")
        .is_empty());
    assert!(service.get_past_follow_ups(&doctor(), ghost).expect("read").is_empty());

    let lonely = service
        .register_patient(&doctor(), details("Lonely", "0"))
        .expect("register");
    assert!(service.get_clinical_history(&doctor(), lonely).expect("read").is_empty());
}

#[test]
fn test_mark_completed_twice_is_idempotent() {
    let (service, _) = test_service();
    let p1 = service
        .register_patient(&doctor(), details("Asha", "1"))
        .expect("register");
    let fu = service
        .schedule_follow_up(
            &doctor(),
            NewFollowUp {
                patient_id: p1,
                appointment_date: NOW + NANOS_PER_DAY,
                notes: "review".into(),
            },
        )
        .expect("schedule");

    service
        .mark_follow_up_completed(&doctor(), fu)
        .expect("first completion");
    service
        .mark_follow_up_completed(&doctor(), fu)
        .expect("second completion");

    let stored = service
        .get_follow_up_by_id(&doctor(), fu)
        .expect("read")
        .expect("exists");
    assert!(stored.is_completed());

    let err = service
        .mark_follow_up_completed(&doctor(), FollowUpId(88))
        .expect_err("unknown follow-up");
    assert!(matches!(err, ClinicError::FollowUpNotFound(FollowUpId(88))));
}

#[test]
fn test_follow_up_upcoming_past_partition_tracks_clock() {
    let (service, clock) = test_service();
    let p1 = service
        .register_patient(&doctor(), details("Asha", "1"))
        .expect("register");
    let schedule = |at: i64| {
        service
            .schedule_follow_up(
                &doctor(),
                NewFollowUp {
                    patient_id: p1,
                    appointment_date: at,
                    notes: String::new(),
                },
            )
            .expect("schedule")
    };
    let overdue = schedule(NOW - NANOS_PER_DAY);
    let tomorrow = schedule(NOW + NANOS_PER_DAY);

    let upcoming = service.get_upcoming_follow_ups(&doctor(), p1).expect("read");
    let past = service.get_past_follow_ups(&doctor(), p1).expect("read");
    assert_eq!(upcoming.iter().map(|f| f.id).collect::<Vec<_>>(), vec![tomorrow]);
    assert_eq!(past.iter().map(|f| f.id).collect::<Vec<_>>(), vec![overdue]);

    clock.advance(2 * NANOS_PER_DAY);
    assert!(service
        .get_upcoming_follow_ups(&doctor(), p1)
        .expect("read")
        .is_empty());
    assert_eq!(service.get_past_follow_ups(&doctor(), p1).expect("read").len(), 2);
}

#[test]
fn test_cancelled_follow_up_is_tombstoned() {
    let (service, _) = test_service();
    let p1 = service
        .register_patient(&doctor(), details("Asha", "1"))
        .expect("register");
    let fu = service
        .schedule_follow_up(
            &doctor(),
            NewFollowUp {
                patient_id: p1,
                appointment_date: NOW + NANOS_PER_DAY,
                notes: "review".into(),
            },
        )
        .expect("schedule");

    service.cancel_follow_up(&doctor(), fu).expect("cancel");
    service.cancel_follow_up(&doctor(), fu).expect("cancel again is a no-op");

    assert!(service.get_all_follow_ups(&doctor()).expect("read").is_empty());
    assert!(service
        .get_upcoming_follow_ups(&doctor(), p1)
        .expect("read")
        .is_empty());
    let stored = service
        .get_follow_up_by_id(&doctor(), fu)
        .expect("read")
        .expect("cancelled follow-ups stay retrievable");
    assert_eq!(stored.status, FollowUpStatus::Cancelled);

    let err = service
        .mark_follow_up_completed(&doctor(), fu)
        .expect_err("cancelled follow-up cannot be completed");
    assert!(matches!(err, ClinicError::FollowUpTransition { .. }));

    let err = service
        .cancel_follow_up(&doctor(), FollowUpId(5))
        .expect_err("unknown follow-up");
    assert!(matches!(err, ClinicError::FollowUpNotFound(FollowUpId(5))));

    let next = service
        .schedule_follow_up(
            &doctor(),
            NewFollowUp {
                patient_id: p1,
                appointment_date: NOW + NANOS_PER_DAY,
                notes: String::new(),
            },
        )
        .expect("schedule");
    assert!(next > fu, "cancelled ids are never reused");
}

#[test]
fn test_search_is_case_insensitive_and_empty_term_is_empty() {
    let (service, _) = test_service();
    service
        .register_patient(&doctor(), details("Asha Rao", "98450-12345"))
        .expect("register");
    service
        .register_patient(&doctor(), details("Ravi", "080-2233"))
        .expect("register");

    let found = service
        .search_patients_by_name(&Principal::anonymous(), "ASHA")
        .expect("guests may search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Asha Rao");

    let found = service
        .search_patients_by_contact(&doctor(), "2233")
        .expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Ravi");

    assert!(service.search_patients_by_name(&doctor(), "").expect("search").is_empty());
    assert!(service
        .search_patients_by_contact(&doctor(), "")
        .expect("search")
        .is_empty());

    let found = service
        .search_patients_by_name(&doctor(), " ")
        .expect("whitespace is an ordinary substring");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Asha Rao");
}

#[test]
fn test_guests_cannot_mutate() {
    let (service, _) = test_service();
    let guest = principal("walk-in");

    let err = service
        .register_patient(&guest, details("Asha", "1"))
        .expect_err("guest cannot register");
    assert!(matches!(
        err,
        ClinicError::Unauthorized {
            required: Role::User,
            actual: Role::Guest
        }
    ));

    let err = service
        .register_patient(&Principal::anonymous(), details("Asha", "1"))
        .expect_err("anonymous cannot register");
    assert!(matches!(err, ClinicError::Unauthorized { .. }));

    assert!(service.get_all_patients(&guest).expect("guests may read").is_empty());
}

#[test]
fn test_saving_a_profile_registers_the_caller() {
    let (service, _) = test_service();
    let nurse = principal("nurse-principal");
    assert_eq!(service.get_caller_user_role(&nurse).expect("role"), Role::Guest);
    assert!(service.get_caller_user_profile(&nurse).expect("profile").is_none());

    let profile = UserProfile {
        name: NonEmptyText::new("Meera").expect("valid name"),
        job_title: "Nurse".into(),
    };
    service
        .save_caller_user_profile(&nurse, profile.clone())
        .expect("save should succeed");

    assert_eq!(service.get_caller_user_role(&nurse).expect("role"), Role::User);
    assert_eq!(
        service.get_caller_user_profile(&nurse).expect("profile"),
        Some(profile.clone())
    );
    service
        .register_patient(&nurse, details("Asha", "1"))
        .expect("registered users may write");

    let err = service
        .save_caller_user_profile(&Principal::anonymous(), profile)
        .expect_err("anonymous cannot save a profile");
    assert!(matches!(err, ClinicError::Unauthorized { .. }));
}

#[test]
fn test_role_assignment_is_admin_only() {
    let (service, _) = test_service();
    let clerk = principal("clerk-principal");

    let err = service
        .assign_caller_user_role(&doctor(), &clerk, Role::User)
        .expect_err("users cannot assign roles");
    assert!(matches!(
        err,
        ClinicError::Unauthorized {
            required: Role::Admin,
            actual: Role::User
        }
    ));

    let err = service
        .assign_caller_user_role(&doctor(), &doctor(), Role::Admin)
        .expect_err("users cannot promote themselves");
    assert!(matches!(err, ClinicError::Unauthorized { .. }));

    assert!(service.is_caller_admin(&admin()).expect("check"));
    assert!(!service.is_caller_admin(&doctor()).expect("check"));

    service
        .assign_caller_user_role(&admin(), &clerk, Role::Admin)
        .expect("admin can promote");
    assert!(service.is_caller_admin(&clerk).expect("check"));
}

#[test]
fn test_last_admin_cannot_demote_itself() {
    let (service, _) = test_service();

    let err = service
        .assign_caller_user_role(&admin(), &admin(), Role::User)
        .expect_err("the only admin must stay admin");
    assert!(matches!(err, ClinicError::InvalidInput(_)));
    assert!(service.is_caller_admin(&admin()).expect("check"));

    let deputy = principal("deputy-principal");
    service
        .assign_caller_user_role(&admin(), &deputy, Role::Admin)
        .expect("admin can promote");
    service
        .assign_caller_user_role(&admin(), &admin(), Role::User)
        .expect("another admin remains");
    assert!(!service.is_caller_admin(&admin()).expect("check"));
    assert!(service.is_caller_admin(&deputy).expect("check"));
}

#[test]
fn test_get_user_profile_requires_self_or_admin() {
    let (service, _) = test_service();
    let profile = UserProfile {
        name: NonEmptyText::new("Dr. Iyer").expect("valid name"),
        job_title: "Physician".into(),
    };
    service
        .save_caller_user_profile(&doctor(), profile.clone())
        .expect("save");

    assert_eq!(
        service
            .get_user_profile(&doctor(), &doctor())
            .expect("own profile"),
        Some(profile.clone())
    );
    assert_eq!(
        service
            .get_user_profile(&admin(), &doctor())
            .expect("admin may read"),
        Some(profile)
    );

    let err = service
        .get_user_profile(&principal("someone-else"), &doctor())
        .expect_err("others may not read");
    assert!(matches!(err, ClinicError::Unauthorized { .. }));
}

#[test]
fn test_snapshot_survives_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let clock = Arc::new(FixedClock::new(NOW));
    let cfg = test_cfg(Some(temp_dir.path()));

    let (p1, v1) = {
        let service = ClinicService::open(&cfg, clock.clone()).expect("open");
        service
            .assign_caller_user_role(&admin(), &doctor(), Role::User)
            .expect("assign");
        let p1 = service
            .register_patient(&doctor(), details("Asha", "1"))
            .expect("register");
        let v1 = service
            .create_clinical_visit(&doctor(), visit_for(p1))
            .expect("visit");
        (p1, v1)
    };

    let reopened = ClinicService::open(&cfg, clock).expect("reopen");
    assert_eq!(
        reopened.get_caller_user_role(&doctor()).expect("role"),
        Role::User
    );
    let history = reopened.get_clinical_history(&doctor(), p1).expect("read");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, v1);
    assert_eq!(history[0].vitals.temperature, Some(38.1));

    let p2 = reopened
        .register_patient(&doctor(), details("Ravi", "2"))
        .expect("register");
    assert!(p2 > p1, "allocator resumes after reopen");
}

#[test]
fn test_in_memory_service_has_no_admin() {
    let service = ClinicService::in_memory(Arc::new(FixedClock::new(NOW)));
    assert!(!service.is_caller_admin(&admin()).expect("check"));
    assert!(service.get_all_follow_ups(&admin()).expect("read").is_empty());
}

/// Makes the next snapshot write fail by occupying the temporary file path with a directory.
fn block_snapshot_writes(data_dir: &std::path::Path) -> std::path::PathBuf {
    let blocker = data_dir.join("clinic.json.tmp");
    std::fs::create_dir_all(&blocker).expect("create blocking directory");
    blocker
}

#[test]
fn test_failed_snapshot_write_reverts_insert_and_skips_its_id() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let clock = Arc::new(FixedClock::new(NOW));
    let cfg = test_cfg(Some(temp_dir.path()));

    let service = ClinicService::open(&cfg, clock.clone()).expect("open");
    service
        .assign_caller_user_role(&admin(), &doctor(), Role::User)
        .expect("assign");
    let asha = service
        .register_patient(&doctor(), details("Asha", "1"))
        .expect("register");

    let blocker = block_snapshot_writes(temp_dir.path());
    let err = service
        .register_patient(&doctor(), details("Ravi", "2"))
        .expect_err("an unsaved registration must not be acknowledged");
    assert!(matches!(err, ClinicError::FileWrite(_)));
    let names: Vec<String> = service
        .get_all_patients(&doctor())
        .expect("read")
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Asha".to_string()]);

    std::fs::remove_dir(&blocker).expect("remove blocking directory");
    let meera = service
        .register_patient(&doctor(), details("Meera", "3"))
        .expect("register");
    assert!(meera > asha);
    drop(service);

    let reopened = ClinicService::open(&cfg, clock).expect("reopen");
    let kiran = reopened
        .register_patient(&doctor(), details("Kiran", "4"))
        .expect("register");
    assert!(kiran > meera, "acknowledged ids are not handed out again");
    assert_eq!(
        reopened
            .get_patient_by_id(&doctor(), meera)
            .expect("read")
            .map(|p| p.name),
        Some("Meera".to_string())
    );
    assert_eq!(
        reopened.get_all_patients(&doctor()).expect("read").len(),
        3
    );
}

#[test]
fn test_failed_snapshot_write_reverts_updates_and_roles() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let clock = Arc::new(FixedClock::new(NOW));
    let cfg = test_cfg(Some(temp_dir.path()));

    let service = ClinicService::open(&cfg, clock).expect("open");
    service
        .assign_caller_user_role(&admin(), &doctor(), Role::User)
        .expect("assign");
    let patient_id = service
        .register_patient(&doctor(), details("Asha", "1"))
        .expect("register");
    let follow_up_id = service
        .schedule_follow_up(
            &doctor(),
            NewFollowUp {
                patient_id,
                appointment_date: NOW + NANOS_PER_DAY,
                notes: String::new(),
            },
        )
        .expect("schedule");

    let _blocker = block_snapshot_writes(temp_dir.path());

    service
        .update_patient(&doctor(), patient_id, details("Asha Renamed", "9"))
        .expect_err("update must fail");
    let patient = service
        .get_patient_by_id(&doctor(), patient_id)
        .expect("read")
        .expect("patient exists");
    assert_eq!(patient.name, "Asha");
    assert_eq!(patient.contact_number, "1");

    service
        .cancel_follow_up(&doctor(), follow_up_id)
        .expect_err("cancel must fail");
    let follow_up = service
        .get_follow_up_by_id(&doctor(), follow_up_id)
        .expect("read")
        .expect("follow-up exists");
    assert_eq!(follow_up.status, FollowUpStatus::Scheduled);

    let clerk = principal("clerk-principal");
    service
        .assign_caller_user_role(&admin(), &clerk, Role::User)
        .expect_err("role change must fail");
    assert_eq!(service.get_caller_user_role(&clerk).expect("role"), Role::Guest);
}
