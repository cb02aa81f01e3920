//! Lifecycle engine error types.

use famlink_adapters::DirectoryError;
use famlink_core::{AccountId, Timestamp};
use famlink_state::{LinkStatus, TransitionError};
use famlink_store::StoreError;
use thiserror::Error;

/// Errors returned by [`LifecycleEngine`](crate::LifecycleEngine) operations.
///
/// Guard refusals carry the data a caller needs to explain the refusal
/// (retry date, reject count, missing contact fields).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Sponsor and member are the same account.
    #[error("an account cannot link to itself")]
    SelfLinkNotAllowed,

    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("sponsor not found: {0}")]
    SponsorNotFound(String),

    /// The member's profile lacks a field needed to contact them.
    #[error("member contact details incomplete: missing {}", .missing.join(", "))]
    IncompleteContactInfo { missing: Vec<String> },

    #[error("a request for this member is already pending since {requested_at}")]
    DuplicateRequest { requested_at: Timestamp },

    #[error("sponsor and member are already linked")]
    AlreadyLinked,

    #[error("cooldown active: a new request is allowed from {retry_at}")]
    CooldownActive { retry_at: Timestamp },

    #[error("request limit reached: rejected {reject_count} times (limit {max})")]
    LimitExceeded { reject_count: u32, max: u32 },

    /// No active link exists for the pair.
    #[error("no link between sponsor {sponsor_id} and member {member_id}")]
    LinkNotFound {
        sponsor_id: AccountId,
        member_id: AccountId,
    },

    /// More than one active record exists for the pair. The engine refuses
    /// to pick one.
    #[error("integrity violation: {count} active links for {sponsor_id} -> {member_id}")]
    MultipleActiveLinksAnomaly {
        sponsor_id: AccountId,
        member_id: AccountId,
        count: usize,
    },

    /// A member tried to remove themselves through the sponsor's removal path.
    #[error("the acting account cannot remove itself from the family")]
    ActiveSessionRemoval,

    #[error("invalid link transition: {from} -> {to}")]
    InvalidTransition { from: LinkStatus, to: LinkStatus },

    /// Concurrent writers kept winning the pair.
    #[error("gave up after {attempts} conflicting write attempts")]
    ConflictRetriesExhausted { attempts: u32 },

    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("link store failure: {0}")]
    Store(String),
}

impl LinkError {
    /// Stable snake_case name of the error kind, used for metric labels
    /// and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SelfLinkNotAllowed => "self_link_not_allowed",
            Self::MemberNotFound(_) => "member_not_found",
            Self::SponsorNotFound(_) => "sponsor_not_found",
            Self::IncompleteContactInfo { .. } => "incomplete_contact_info",
            Self::DuplicateRequest { .. } => "duplicate_request",
            Self::AlreadyLinked => "already_linked",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::LimitExceeded { .. } => "limit_exceeded",
            Self::LinkNotFound { .. } => "link_not_found",
            Self::MultipleActiveLinksAnomaly { .. } => "multiple_active_links_anomaly",
            Self::ActiveSessionRemoval => "active_session_removal",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ConflictRetriesExhausted { .. } => "conflict_retries_exhausted",
            Self::DirectoryUnavailable(_) => "directory_unavailable",
            Self::Store(_) => "store_failure",
        }
    }

    /// A business rule refused the operation (as opposed to an
    /// infrastructure or integrity failure).
    pub fn is_guard_refusal(&self) -> bool {
        !matches!(
            self,
            Self::MultipleActiveLinksAnomaly { .. }
                | Self::ConflictRetriesExhausted { .. }
                | Self::DirectoryUnavailable(_)
                | Self::Store(_)
        )
    }

    /// Map a directory failure for the member side.
    pub(crate) fn from_member_lookup(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(what) => Self::MemberNotFound(what),
            other => Self::DirectoryUnavailable(other.to_string()),
        }
    }

    /// Map a directory failure for the sponsor side.
    pub(crate) fn from_sponsor_lookup(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(what) => Self::SponsorNotFound(what),
            other => Self::DirectoryUnavailable(other.to_string()),
        }
    }
}

impl From<TransitionError> for LinkError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            TransitionError::DuplicateRequest { requested_at } => {
                Self::DuplicateRequest { requested_at }
            }
            TransitionError::AlreadyLinked => Self::AlreadyLinked,
            TransitionError::CooldownActive { retry_at } => Self::CooldownActive { retry_at },
            TransitionError::LimitExceeded { reject_count, max } => {
                Self::LimitExceeded { reject_count, max }
            }
        }
    }
}

/// Non-conflict store failures. Conflicts never reach callers as-is; the
/// engine retries them.
impl From<StoreError> for LinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePair {
                sponsor_id,
                member_id,
                count,
            } => Self::MultipleActiveLinksAnomaly {
                sponsor_id,
                member_id,
                count,
            },
            other => Self::Store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    #[test]
    fn duplicate_pair_becomes_anomaly() {
        let err: LinkError = StoreError::DuplicatePair {
            sponsor_id: acct("s"),
            member_id: acct("m"),
            count: 2,
        }
        .into();
        assert_eq!(err.kind(), "multiple_active_links_anomaly");
        assert!(!err.is_guard_refusal());
    }

    #[test]
    fn transition_errors_keep_their_payload() {
        let err: LinkError = TransitionError::LimitExceeded {
            reject_count: 3,
            max: 3,
        }
        .into();
        assert_eq!(
            err,
            LinkError::LimitExceeded {
                reject_count: 3,
                max: 3
            }
        );
        assert!(err.is_guard_refusal());
    }

    #[test]
    fn directory_outage_is_not_a_not_found() {
        let err = LinkError::from_member_lookup(DirectoryError::Unavailable {
            reason: "timeout".into(),
        });
        assert!(matches!(err, LinkError::DirectoryUnavailable(_)));
        let err = LinkError::from_sponsor_lookup(DirectoryError::NotFound("id s".into()));
        assert!(matches!(err, LinkError::SponsorNotFound(_)));
    }

    #[test]
    fn incomplete_contact_lists_fields() {
        let err = LinkError::IncompleteContactInfo {
            missing: vec!["phone".into(), "country_code".into()],
        };
        assert_eq!(
            err.to_string(),
            "member contact details incomplete: missing phone, country_code"
        );
    }
}
