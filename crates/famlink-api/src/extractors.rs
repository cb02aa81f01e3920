//! # Extractors & Validation
//!
//! Request DTOs arrive as plain strings and are parsed into typed
//! identifiers through [`Parse`]. Malformed JSON maps to
//! [`AppError::BadRequest`], unparsable fields to [`AppError::Validation`].

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::Json;

use famlink_core::AccountId;

use crate::error::AppError;

/// Header naming the account performing a sponsor-side removal.
pub const ACTING_ACCOUNT_HEADER: &str = "x-account-id";

/// Request bodies that convert into a typed command.
pub trait Parse {
    type Output;

    fn parse(self) -> Result<Self::Output, AppError>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and parse it into its typed form.
pub fn extract_parsed_json<T: Parse>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Output, AppError> {
    extract_json(result)?.parse()
}

/// The account id carried by the [`ACTING_ACCOUNT_HEADER`] header.
pub fn acting_account(headers: &HeaderMap) -> Result<AccountId, AppError> {
    let raw = headers
        .get(ACTING_ACCOUNT_HEADER)
        .ok_or_else(|| AppError::BadRequest(format!("missing {ACTING_ACCOUNT_HEADER} header")))?
        .to_str()
        .map_err(|_| AppError::BadRequest(format!("{ACTING_ACCOUNT_HEADER} is not valid text")))?;
    Ok(AccountId::new(raw)?)
}
