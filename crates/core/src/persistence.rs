//! JSON snapshot file for the clinic store.
//!
//! The whole store is written as one pretty-printed JSON document. Writes go to
//! a temporary sibling first and are renamed over the live file, so a crash
//! mid-write leaves the previous snapshot intact.

use crate::constants::SNAPSHOT_FILENAME;
use crate::error::{ClinicError, ClinicResult};
use crate::store::StoreSnapshot;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Snapshot file inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SNAPSHOT_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot, or `None` if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::FileRead`] or [`ClinicError::Deserialization`].
    pub fn load(&self) -> ClinicResult<Option<StoreSnapshot>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClinicError::FileRead(e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(ClinicError::Deserialization)
    }

    /// Atomically replaces the snapshot file, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::StorageDirCreation`], [`ClinicError::Serialization`]
    /// or [`ClinicError::FileWrite`].
    pub fn save(&self, snapshot: &StoreSnapshot) -> ClinicResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(ClinicError::StorageDirCreation)?;
        }

        let json = serde_json::to_string_pretty(snapshot).map_err(ClinicError::Serialization)?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(ClinicError::FileWrite)?;
        fs::rename(&tmp_path, &self.path).map_err(ClinicError::FileWrite)?;

        Ok(())
    }
}
