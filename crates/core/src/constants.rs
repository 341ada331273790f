//! Constants used throughout the OPD core crate.

/// Default directory for the clinic snapshot when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "clinic_data";

/// `OPD_DATA_DIR` value that disables persistence entirely.
pub const IN_MEMORY_DATA_DIR: &str = ":memory:";

/// Filename of the store snapshot inside the data directory.
pub const SNAPSHOT_FILENAME: &str = "clinic.json";
