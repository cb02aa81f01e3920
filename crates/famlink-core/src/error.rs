//! # Validation Errors
//!
//! Errors raised when constructing domain primitives from untrusted input.
//! All errors use `thiserror`; messages include the offending value so
//! callers can surface them unchanged.

use thiserror::Error;

/// Error constructing a validated primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Account identifier is empty, too long, or contains whitespace.
    #[error("invalid account id {0:?}: must be 1-{max} non-whitespace characters", max = crate::identity::MAX_ID_LEN)]
    InvalidAccountId(String),

    /// Account code is empty, too long, or not alphanumeric.
    #[error("invalid account code {0:?}: must be 1-{max} ASCII letters, digits, '-' or '_'", max = crate::identity::MAX_CODE_LEN)]
    InvalidAccountCode(String),

    /// Link identifier is not a UUID.
    #[error("invalid link id {0:?}")]
    InvalidLinkId(String),

    /// Timestamp could not be parsed or was out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
