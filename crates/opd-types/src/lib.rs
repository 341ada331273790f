//! # OPD Types
//!
//! Validated primitive types shared by every crate in the OPD records workspace.
//!
//! - [`NonEmptyText`]: trimmed text guaranteed to contain at least one non-whitespace character.
//! - [`Principal`]: the opaque caller identity handed to the core by the external
//!   authentication collaborator.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text contained characters that are not allowed in the target type
    #[error("Text contains invalid characters: {0}")]
    InvalidCharacters(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Textual form of the anonymous principal.
pub const ANONYMOUS_PRINCIPAL: &str = "2vxsx-fae";

/// Opaque identity of the caller of an operation.
///
/// The core never authenticates principals itself; it only compares them and
/// looks up the role recorded against them. The textual form is trimmed and must
/// not contain whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal(String);

impl Principal {
    /// Parses a principal from its textual form.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for blank input and `TextError::InvalidCharacters`
    /// if the trimmed input contains whitespace or control characters.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(TextError::InvalidCharacters(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The principal used for unauthenticated callers.
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_PRINCIPAL.to_owned())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_PRINCIPAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Principal {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Principal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Principal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Principal::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Dr. Rao  ").expect("should accept padded text");
        assert_eq!(text.as_str(), "Dr. Rao");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        let err = NonEmptyText::new(" \t\n").expect_err("blank text should be rejected");
        assert_eq!(err, TextError::Empty);
    }

    #[test]
    fn test_principal_rejects_inner_whitespace() {
        let err = Principal::parse("abc def").expect_err("inner whitespace should be rejected");
        assert!(matches!(err, TextError::InvalidCharacters(_)));
    }

    #[test]
    fn test_principal_anonymous_round_trips_through_parse() {
        let parsed = Principal::parse(ANONYMOUS_PRINCIPAL).expect("anonymous text is valid");
        assert!(parsed.is_anonymous());
        assert_eq!(parsed, Principal::anonymous());
    }

    #[test]
    fn test_principal_deserialize_validates() {
        let err = serde_json::from_str::<Principal>("\"  \"");
        assert!(err.is_err(), "blank principal should fail to deserialize");

        let ok: Principal = serde_json::from_str("\"rdmx6-jaaaa\"").expect("valid principal");
        assert_eq!(ok.as_str(), "rdmx6-jaaaa");
    }
}
