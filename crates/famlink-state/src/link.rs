//! # Family Link Record and Transitions
//!
//! A [`FamilyLink`] is the single persistent record of one sponsor/member
//! relationship. It is created once per ordered pair and mutated in place
//! for the rest of its life; the reject counter and cooldown dates survive
//! every transition so the history that drives the cooldown rules is never
//! lost.
//!
//! ## Transitions
//!
//! | Method | From | To | Counts as rejection |
//! |---|---|---|---|
//! | [`FamilyLink::initiate`] | absent | `INITIATED` | no |
//! | [`FamilyLink::approve`] | `INITIATED` | `APPROVED` | no |
//! | [`FamilyLink::decline`] | `INITIATED` | `REJECTED` | yes |
//! | [`FamilyLink::revoke`] | `APPROVED` | `REVOKED` | yes |
//! | [`FamilyLink::leave`] | `APPROVED` | `REJECTED` | yes |
//! | [`FamilyLink::re_request`] | `REJECTED` / `REVOKED` | `INITIATED` | no |
//!
//! Sponsor-initiated removal lands in `REVOKED`; member-initiated removal
//! lands in `REJECTED`. The two states have different re-request rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use famlink_core::{AccountId, LinkId, Timestamp};

use crate::policy::{cooldown_check, LinkPolicy, ResendEligibility};

// ─── Link Status ─────────────────────────────────────────────────────

/// Lifecycle status of a family link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkStatus {
    /// Sponsor has asked; the member has not decided.
    Initiated,
    /// Member accepted; the sponsor has access.
    Approved,
    /// Member declined, or left after approving.
    Rejected,
    /// Sponsor removed an approved member.
    Revoked,
}

impl LinkStatus {
    /// Canonical upper-case name, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LinkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIATED" => Ok(Self::Initiated),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "REVOKED" => Ok(Self::Revoked),
            other => Err(format!("unknown link status {other:?}")),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A transition refused by the state machine. The record is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The trigger is not valid from the current status.
    #[error("invalid link transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: LinkStatus,
        /// Attempted target status.
        to: LinkStatus,
    },

    /// A request for this pair is already awaiting the member's decision.
    #[error("a request for this member is already pending since {requested_at}")]
    DuplicateRequest {
        /// When the pending request was sent.
        requested_at: Timestamp,
    },

    /// The pair is already linked.
    #[error("sponsor and member are already linked")]
    AlreadyLinked,

    /// The cooldown after the last rejection or revocation has not elapsed.
    #[error("cooldown active: a new request is allowed from {retry_at}")]
    CooldownActive {
        /// Earliest instant at which a re-request is accepted.
        retry_at: Timestamp,
    },

    /// The pair has been rejected too many times.
    #[error("request limit reached: rejected {reject_count} times (limit {max})")]
    LimitExceeded {
        /// Rejections recorded so far.
        reject_count: u32,
        /// The configured ceiling.
        max: u32,
    },
}

// ─── Transition Evidence ─────────────────────────────────────────────

/// Who triggered a transition and why.
#[derive(Debug, Clone)]
pub struct LinkTransitionEvidence {
    /// Account that performed the action.
    pub actor: AccountId,
    /// Short machine-friendly reason (e.g. `member_declined`).
    pub reason: String,
}

impl LinkTransitionEvidence {
    pub fn new(actor: AccountId, reason: impl Into<String>) -> Self {
        Self {
            actor,
            reason: reason.into(),
        }
    }
}

/// Record of a link state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTransitionRecord {
    /// Status before the transition; `None` for creation.
    pub from_state: Option<LinkStatus>,
    /// Status after the transition.
    pub to_state: LinkStatus,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Account that performed the action.
    pub actor: AccountId,
    /// Reason for the transition.
    pub reason: String,
}

// ─── Family Link ─────────────────────────────────────────────────────

/// One sponsor/member relationship and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyLink {
    /// Surrogate identifier, immutable.
    pub id: LinkId,
    /// The account that sends requests and gains access.
    pub sponsor_id: AccountId,
    /// The account being invited.
    pub member_id: AccountId,
    /// Current lifecycle status.
    pub status: LinkStatus,
    /// Transitions into `REJECTED` or `REVOKED` so far. Never reset.
    pub reject_count: u32,
    /// Most recent transition into `REJECTED` or `REVOKED`.
    pub last_reject_date: Option<Timestamp>,
    /// Most recent re-request.
    pub new_request_date: Option<Timestamp>,
    /// `"<sponsor> — <member>"` label, refreshed on every (re-)request.
    pub display_name: String,
    pub created_date: Timestamp,
    pub last_modified_date: Timestamp,
    /// Soft-delete flag. Inactive records are kept for history only.
    pub is_active: bool,
    /// Optimistic concurrency token. `0` until first stored.
    pub version: u64,
    /// Ordered log of all state transitions.
    pub transitions: Vec<LinkTransitionRecord>,
}

impl FamilyLink {
    /// Create a new link in `INITIATED` with `reject_count = 0`.
    pub fn initiate(
        sponsor_id: AccountId,
        member_id: AccountId,
        display_name: String,
        evidence: LinkTransitionEvidence,
        now: Timestamp,
    ) -> Self {
        Self {
            id: LinkId::new(),
            sponsor_id,
            member_id,
            status: LinkStatus::Initiated,
            reject_count: 0,
            last_reject_date: None,
            new_request_date: None,
            display_name,
            created_date: now,
            last_modified_date: now,
            is_active: true,
            version: 0,
            transitions: vec![LinkTransitionRecord {
                from_state: None,
                to_state: LinkStatus::Initiated,
                timestamp: now,
                actor: evidence.actor,
                reason: evidence.reason,
            }],
        }
    }

    /// Member accepts (INITIATED → APPROVED).
    pub fn approve(
        &mut self,
        evidence: LinkTransitionEvidence,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.require_status(LinkStatus::Initiated, LinkStatus::Approved)?;
        self.do_transition(LinkStatus::Approved, evidence, now);
        Ok(())
    }

    /// Member declines a pending request (INITIATED → REJECTED).
    pub fn decline(
        &mut self,
        evidence: LinkTransitionEvidence,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.require_status(LinkStatus::Initiated, LinkStatus::Rejected)?;
        self.record_rejection(LinkStatus::Rejected, evidence, now);
        Ok(())
    }

    /// Sponsor removes an approved member (APPROVED → REVOKED).
    pub fn revoke(
        &mut self,
        evidence: LinkTransitionEvidence,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.require_status(LinkStatus::Approved, LinkStatus::Revoked)?;
        self.record_rejection(LinkStatus::Revoked, evidence, now);
        Ok(())
    }

    /// Member removes their sponsor (APPROVED → REJECTED).
    pub fn leave(
        &mut self,
        evidence: LinkTransitionEvidence,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.require_status(LinkStatus::Approved, LinkStatus::Rejected)?;
        self.record_rejection(LinkStatus::Rejected, evidence, now);
        Ok(())
    }

    /// Sponsor asks again for an existing pair (REJECTED / REVOKED → INITIATED).
    ///
    /// Refused according to [`FamilyLink::resend_eligibility`]. On success the
    /// record is reused, `new_request_date` is set and the display name is
    /// refreshed.
    pub fn re_request(
        &mut self,
        policy: &LinkPolicy,
        display_name: String,
        evidence: LinkTransitionEvidence,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        match self.resend_eligibility(policy, now) {
            ResendEligibility::Eligible => {
                self.new_request_date = Some(now);
                self.display_name = display_name;
                self.do_transition(LinkStatus::Initiated, evidence, now);
                Ok(())
            }
            ResendEligibility::AwaitingDecision { requested_at } => {
                Err(TransitionError::DuplicateRequest { requested_at })
            }
            ResendEligibility::AlreadyLinked => Err(TransitionError::AlreadyLinked),
            ResendEligibility::CooldownActive { retry_at } => {
                Err(TransitionError::CooldownActive { retry_at })
            }
            ResendEligibility::LimitExceeded { reject_count, max } => {
                Err(TransitionError::LimitExceeded { reject_count, max })
            }
        }
    }

    /// Whether a re-request would be accepted at `now`.
    ///
    /// The attempt ceiling is checked before the cooldown, so a pair at the
    /// ceiling reports `LimitExceeded` however much time has passed.
    pub fn resend_eligibility(&self, policy: &LinkPolicy, now: Timestamp) -> ResendEligibility {
        match self.status {
            LinkStatus::Initiated => ResendEligibility::AwaitingDecision {
                requested_at: self.requested_at(),
            },
            LinkStatus::Approved => ResendEligibility::AlreadyLinked,
            LinkStatus::Rejected => {
                if self.reject_count >= policy.max_reject_attempts {
                    ResendEligibility::LimitExceeded {
                        reject_count: self.reject_count,
                        max: policy.max_reject_attempts,
                    }
                } else {
                    cooldown_check(self.cooldown_anchor(), policy.reject_cooldown_days, now)
                }
            }
            LinkStatus::Revoked => {
                cooldown_check(self.cooldown_anchor(), policy.revoke_cooldown_days, now)
            }
        }
    }

    /// Re-requests left before the ceiling. `None` on the `REVOKED` path,
    /// which has no ceiling.
    pub fn remaining_attempts(&self, policy: &LinkPolicy) -> Option<u32> {
        match self.status {
            LinkStatus::Revoked => None,
            _ => Some(policy.max_reject_attempts.saturating_sub(self.reject_count)),
        }
    }

    /// Later of `last_reject_date` and `new_request_date`.
    pub fn cooldown_anchor(&self) -> Option<Timestamp> {
        match (self.last_reject_date, self.new_request_date) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// When the current (or most recent) request was sent.
    pub fn requested_at(&self) -> Timestamp {
        self.new_request_date.unwrap_or(self.created_date)
    }

    /// Whether this record belongs to the ordered `(sponsor, member)` pair.
    pub fn is_pair(&self, sponsor_id: &AccountId, member_id: &AccountId) -> bool {
        &self.sponsor_id == sponsor_id && &self.member_id == member_id
    }

    fn require_status(&self, expected: LinkStatus, target: LinkStatus) -> Result<(), TransitionError> {
        if self.status != expected {
            return Err(TransitionError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn record_rejection(&mut self, to: LinkStatus, evidence: LinkTransitionEvidence, now: Timestamp) {
        self.reject_count = self.reject_count.saturating_add(1);
        self.last_reject_date = Some(now);
        self.do_transition(to, evidence, now);
    }

    fn do_transition(&mut self, to: LinkStatus, evidence: LinkTransitionEvidence, now: Timestamp) {
        self.transitions.push(LinkTransitionRecord {
            from_state: Some(self.status),
            to_state: to,
            timestamp: now,
            actor: evidence.actor,
            reason: evidence.reason,
        });
        self.status = to;
        self.last_modified_date = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
