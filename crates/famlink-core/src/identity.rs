//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers the linkage engine handles.
//! These prevent accidental identifier confusion: you cannot pass an
//! [`AccountCode`] (the human-shareable code a sponsor types in) where an
//! [`AccountId`] (the directory's opaque identifier) is expected.
//!
//! ## Validation
//!
//! String-based identifiers validate at construction time, including when
//! deserialized. [`LinkId`] is UUID-based and always valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum length of an [`AccountId`].
pub const MAX_ID_LEN: usize = 128;

/// Maximum length of an [`AccountCode`].
pub const MAX_CODE_LEN: usize = 32;

/// Route `Deserialize` through the validating constructor so invalid
/// values are rejected at the boundary rather than silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Opaque identifier of an account, as issued by the directory.
///
/// The engine never interprets the contents; it only compares them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl_validating_deserialize!(AccountId);

impl AccountId {
    /// Create an account identifier, rejecting empty, oversized, or
    /// whitespace-containing values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.len() > MAX_ID_LEN || s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidAccountId(s));
        }
        Ok(Self(s))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// AccountCode
// ---------------------------------------------------------------------------

/// Human-shareable account code (e.g. `M001`).
///
/// Codes are compared case-insensitively, so they are normalised to upper
/// case at construction. Surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountCode(String);

impl_validating_deserialize!(AccountCode);

impl AccountCode {
    /// Create a code, trimming and upper-casing the input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let s = raw.trim().to_ascii_uppercase();
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if s.is_empty() || s.len() > MAX_CODE_LEN || !valid_chars {
            return Err(ValidationError::InvalidAccountCode(raw));
        }
        Ok(Self(s))
    }

    /// Borrow the normalised code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// LinkId
// ---------------------------------------------------------------------------

/// Surrogate identifier of a family link record. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(Uuid);

impl LinkId {
    /// Generate a new random link identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a link identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for LinkId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LinkId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s)
            .map(Self)
            .map_err(|_| ValidationError::InvalidLinkId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_accepts_opaque_values() {
        assert!(AccountId::new("usr_01HZX").is_ok());
        assert!(AccountId::new("42").is_ok());
    }

    #[test]
    fn account_id_rejects_empty_and_whitespace() {
        assert!(AccountId::new("").is_err());
        assert!(AccountId::new("a b").is_err());
        assert!(AccountId::new("x".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn account_code_normalises_case_and_whitespace() {
        let code = AccountCode::new("  m001 ").unwrap();
        assert_eq!(code.as_str(), "M001");
        assert_eq!(code, AccountCode::new("M001").unwrap());
    }

    #[test]
    fn account_code_rejects_punctuation() {
        assert!(AccountCode::new("M 001").is_err());
        assert!(AccountCode::new("M@01").is_err());
        assert!(AccountCode::new("   ").is_err());
    }

    #[test]
    fn deserialize_rejects_invalid_account_id() {
        let result: Result<AccountId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
        let ok: AccountId = serde_json::from_str("\"acct-1\"").unwrap();
        assert_eq!(ok.as_str(), "acct-1");
    }

    #[test]
    fn deserialize_normalises_account_code() {
        let code: AccountCode = serde_json::from_str("\"m001\"").unwrap();
        assert_eq!(code.as_str(), "M001");
    }

    #[test]
    fn link_id_parses_uuid() {
        let id = LinkId::new();
        let parsed: LinkId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<LinkId>().is_err());
    }
}
