use opd_types::{Principal, TextError};

/// Header carrying the authenticated caller's principal.
///
/// Authentication itself happens upstream; this service trusts the value it is handed.
pub const CALLER_HEADER: &str = "x-caller-principal";

/// Resolves the caller from the raw [`CALLER_HEADER`] value.
///
/// A missing or blank header is the anonymous principal.
///
/// # Errors
///
/// Returns `TextError::InvalidCharacters` if the value contains whitespace or control characters.
pub fn caller_from_header(value: Option<&str>) -> Result<Principal, TextError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Principal::parse(v),
        None => Ok(Principal::anonymous()),
    }
}
