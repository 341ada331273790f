//! Entity collections.
//!
//! Each submodule defines one entity type of the clinic record together with the
//! collection-level operations on it. [`shared`] holds the generic keyed
//! collection and identifier allocator they all build on.

pub mod follow_ups;
pub mod patients;
pub mod prescriptions;
pub mod shared;
pub mod visits;
