//! # Link Policy and Resend Eligibility
//!
//! The three policy constants of the lifecycle and the arithmetic that
//! decides whether a sponsor may send a request again.
//!
//! ## Rules
//!
//! - From `REJECTED`: refused with `LimitExceeded` once `reject_count`
//!   reaches `max_reject_attempts`, regardless of elapsed time. Otherwise
//!   refused with `CooldownActive` until `reject_cooldown_days` whole days
//!   have passed since the cooldown anchor.
//! - From `REVOKED`: only the `revoke_cooldown_days` cooldown applies.
//!   There is no attempt ceiling on this path.
//!
//! The cooldown anchor is the later of `last_reject_date` and
//! `new_request_date`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use famlink_core::Timestamp;

/// Policy constants for the linkage lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkPolicy {
    /// Rejections after which a `REJECTED` pair can never be re-requested.
    pub max_reject_attempts: u32,
    /// Whole days to wait after a rejection before re-requesting.
    pub reject_cooldown_days: u32,
    /// Whole days to wait after a revocation before re-requesting.
    pub revoke_cooldown_days: u32,
}

impl LinkPolicy {
    pub const DEFAULT_MAX_REJECT_ATTEMPTS: u32 = 3;
    pub const DEFAULT_REJECT_COOLDOWN_DAYS: u32 = 7;
    pub const DEFAULT_REVOKE_COOLDOWN_DAYS: u32 = 30;

    /// Reject configurations that would make every link permanently locked.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_reject_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        Ok(())
    }
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            max_reject_attempts: Self::DEFAULT_MAX_REJECT_ATTEMPTS,
            reject_cooldown_days: Self::DEFAULT_REJECT_COOLDOWN_DAYS,
            revoke_cooldown_days: Self::DEFAULT_REVOKE_COOLDOWN_DAYS,
        }
    }
}

/// Invalid policy configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("max_reject_attempts must be at least 1")]
    ZeroAttempts,
}

/// Whether a new request for an existing pair would be accepted now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResendEligibility {
    /// A re-request would move the link back to `INITIATED`.
    Eligible,
    /// A request is already pending the member's decision.
    AwaitingDecision {
        /// When the pending request was sent.
        requested_at: Timestamp,
    },
    /// The pair is already linked.
    AlreadyLinked,
    /// The cooldown has not yet elapsed.
    CooldownActive {
        /// Earliest instant at which a re-request is accepted.
        retry_at: Timestamp,
    },
    /// The pair has been rejected too many times.
    LimitExceeded {
        /// Rejections recorded so far.
        reject_count: u32,
        /// The configured ceiling.
        max: u32,
    },
}

impl ResendEligibility {
    /// Whether a re-request would succeed.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Cooldown check shared by both re-request paths.
pub(crate) fn cooldown_check(
    anchor: Option<Timestamp>,
    cooldown_days: u32,
    now: Timestamp,
) -> ResendEligibility {
    match anchor {
        Some(anchor) if now.whole_days_since(anchor) < i64::from(cooldown_days) => {
            ResendEligibility::CooldownActive {
                retry_at: anchor.plus_days(cooldown_days),
            }
        }
        _ => ResendEligibility::Eligible,
    }
}
