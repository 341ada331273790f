//! # OPD Core
//!
//! Core business logic for the OPD clinic records service.
//!
//! This crate contains pure data operations:
//! - Patient, clinical visit, follow-up and prescription collections with
//!   monotonically allocated identifiers
//! - Role-gated service operations for the three caller roles (guest, user, admin)
//! - Referential integrity checks between patients, visits and prescriptions
//! - Patient search by name and contact number
//! - JSON snapshot persistence of the whole store
//!
//! **No API concerns**: HTTP servers, request parsing and caller authentication belong in
//! `api-rest` or `api-shared`.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod ids;
pub mod integrity;
pub mod persistence;
pub mod repositories;
pub mod search;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use error::{ClinicError, ClinicResult};
pub use identity::{Role, UserProfile};
pub use ids::{FollowUpId, PatientId, PrescriptionId, Timestamp, VisitId};
pub use opd_types::{NonEmptyText, Principal, TextError, ANONYMOUS_PRINCIPAL};
pub use repositories::follow_ups::{FollowUp, FollowUpStatus, NewFollowUp};
pub use repositories::patients::{Gender, Patient, PatientDetails};
pub use repositories::prescriptions::{Medicine, NewPrescription, Prescription, PrescriptionUpdate};
pub use repositories::visits::{ClinicalVisit, NewVisit, VisitUpdate, Vitals};
pub use service::ClinicService;
