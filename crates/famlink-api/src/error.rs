//! # API Error Types
//!
//! [`AppError`] implements `axum::response::IntoResponse`. Lifecycle
//! refusals from the engine keep their typed payload so the response can
//! carry it in `details` (retry date, reject count, missing fields).
//! Server-side failures are logged and returned with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use famlink_engine::LinkError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `COOLDOWN_ACTIVE`).
    pub code: String,
    pub message: String,
    /// Refusal payload. Never present on 5xx responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// A path or body field failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Body could not be parsed or a required header is missing (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// Refusal or failure reported by the lifecycle engine.
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Link(err) => link_status_and_code(err),
        }
    }

    fn is_server_error(&self) -> bool {
        self.status_and_code().0.is_server_error()
    }

    /// Payload of a refusal, for client errors only.
    fn details(&self) -> Option<serde_json::Value> {
        let Self::Link(err) = self else {
            return None;
        };
        match err {
            LinkError::CooldownActive { retry_at } => Some(json!({ "retry_at": retry_at })),
            LinkError::LimitExceeded { reject_count, max } => {
                Some(json!({ "reject_count": reject_count, "max": max }))
            }
            LinkError::DuplicateRequest { requested_at } => {
                Some(json!({ "requested_at": requested_at }))
            }
            LinkError::IncompleteContactInfo { missing } => Some(json!({ "missing": missing })),
            LinkError::InvalidTransition { from, to } => Some(json!({ "from": from, "to": to })),
            _ => None,
        }
    }
}

fn link_status_and_code(err: &LinkError) -> (StatusCode, &'static str) {
    match err {
        LinkError::MemberNotFound(_) => (StatusCode::NOT_FOUND, "MEMBER_NOT_FOUND"),
        LinkError::SponsorNotFound(_) => (StatusCode::NOT_FOUND, "SPONSOR_NOT_FOUND"),
        LinkError::LinkNotFound { .. } => (StatusCode::NOT_FOUND, "LINK_NOT_FOUND"),
        LinkError::SelfLinkNotAllowed => {
            (StatusCode::UNPROCESSABLE_ENTITY, "SELF_LINK_NOT_ALLOWED")
        }
        LinkError::IncompleteContactInfo { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INCOMPLETE_CONTACT_INFO")
        }
        LinkError::DuplicateRequest { .. } => (StatusCode::CONFLICT, "DUPLICATE_REQUEST"),
        LinkError::AlreadyLinked => (StatusCode::CONFLICT, "ALREADY_LINKED"),
        LinkError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        LinkError::CooldownActive { .. } => (StatusCode::TOO_MANY_REQUESTS, "COOLDOWN_ACTIVE"),
        LinkError::LimitExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "LIMIT_EXCEEDED"),
        LinkError::ActiveSessionRemoval => (StatusCode::FORBIDDEN, "ACTIVE_SESSION_REMOVAL"),
        LinkError::DirectoryUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "DIRECTORY_UNAVAILABLE")
        }
        LinkError::MultipleActiveLinksAnomaly { .. }
        | LinkError::ConflictRetriesExhausted { .. }
        | LinkError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
            ("An internal error occurred".to_string(), None)
        } else {
            if self.is_server_error() {
                tracing::warn!(error = %self, code, "upstream failure");
            }
            (self.to_string(), self.details())
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<famlink_core::ValidationError> for AppError {
    fn from(err: famlink_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
