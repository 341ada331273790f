//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads process-wide environment variables,
//! which keeps behaviour consistent across multi-threaded runtimes and test harnesses.

use crate::constants::{DEFAULT_DATA_DIR, IN_MEMORY_DATA_DIR};
use crate::error::{ClinicError, ClinicResult};
use opd_types::Principal;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, Default)]
pub struct CoreConfig {
    data_dir: Option<PathBuf>,
    bootstrap_admin: Option<Principal>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `data_dir = None` keeps the store purely in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::InvalidInput`] if `data_dir` exists but is not a directory, or if
    /// the bootstrap admin is the anonymous principal.
    pub fn new(data_dir: Option<PathBuf>, bootstrap_admin: Option<Principal>) -> ClinicResult<Self> {
        if let Some(dir) = &data_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(ClinicError::InvalidInput(format!(
                    "data directory {} is not a directory",
                    dir.display()
                )));
            }
        }

        if bootstrap_admin.as_ref().is_some_and(Principal::is_anonymous) {
            return Err(ClinicError::InvalidInput(
                "the anonymous principal cannot be the bootstrap admin".into(),
            ));
        }

        Ok(Self {
            data_dir,
            bootstrap_admin,
        })
    }

    /// Configuration for a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn bootstrap_admin(&self) -> Option<&Principal> {
        self.bootstrap_admin.as_ref()
    }
}

/// Resolve the data directory from an optional `OPD_DATA_DIR` value.
///
/// Unset or blank falls back to [`DEFAULT_DATA_DIR`]; `:memory:` disables persistence.
pub fn data_dir_from_env_value(value: Option<String>) -> Option<PathBuf> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        Some(IN_MEMORY_DATA_DIR) => None,
        Some(dir) => Some(PathBuf::from(dir)),
        None => Some(PathBuf::from(DEFAULT_DATA_DIR)),
    }
}

/// Parse the bootstrap admin from an optional `OPD_BOOTSTRAP_ADMIN` value.
///
/// If `value` is `None` or empty/whitespace, no bootstrap admin is configured.
///
/// # Errors
///
/// Returns [`ClinicError::Text`] if the value is not a valid principal.
pub fn bootstrap_admin_from_env_value(value: Option<String>) -> ClinicResult<Option<Principal>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    Ok(value.map(Principal::parse).transpose()?)
}
