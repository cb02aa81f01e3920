//! Read models returned by the engine's queries.

use serde::Serialize;

use famlink_core::{AccountId, LinkId, Timestamp};
use famlink_state::{FamilyLink, LinkPolicy, LinkStatus, ResendEligibility};

/// A link as seen by one of its two parties.
///
/// `counterpart_*` describes the other party: the member in sponsor-side
/// listings, the sponsor in member-side listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkView {
    pub link_id: LinkId,
    pub sponsor_id: AccountId,
    pub member_id: AccountId,
    pub status: LinkStatus,
    pub counterpart_id: AccountId,
    pub counterpart_name: String,
    pub display_name: String,
    pub reject_count: u32,
    pub requested_at: Timestamp,
    pub last_modified_date: Timestamp,
    /// Present on outgoing (sponsor-side, not approved) listings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<ResendEligibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
}

/// Which side of the link the caller is looking from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Viewer {
    Sponsor,
    Member,
}

impl LinkView {
    pub(crate) fn new(link: &FamilyLink, viewer: Viewer, counterpart_name: String) -> Self {
        let counterpart_id = match viewer {
            Viewer::Sponsor => link.member_id.clone(),
            Viewer::Member => link.sponsor_id.clone(),
        };
        Self {
            link_id: link.id,
            sponsor_id: link.sponsor_id.clone(),
            member_id: link.member_id.clone(),
            status: link.status,
            counterpart_id,
            counterpart_name,
            display_name: link.display_name.clone(),
            reject_count: link.reject_count,
            requested_at: link.requested_at(),
            last_modified_date: link.last_modified_date,
            eligibility: None,
            remaining_attempts: None,
        }
    }

    pub(crate) fn with_eligibility(mut self, link: &FamilyLink, policy: &LinkPolicy, now: Timestamp) -> Self {
        self.eligibility = Some(link.resend_eligibility(policy, now));
        self.remaining_attempts = link.remaining_attempts(policy);
        self
    }
}

/// Resend eligibility of an existing pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityReport {
    pub link_id: LinkId,
    pub status: LinkStatus,
    pub reject_count: u32,
    pub eligibility: ResendEligibility,
    /// `None` on the revoked path, which has no attempt ceiling.
    pub remaining_attempts: Option<u32>,
}

impl EligibilityReport {
    pub(crate) fn evaluate(link: &FamilyLink, policy: &LinkPolicy, now: Timestamp) -> Self {
        Self {
            link_id: link.id,
            status: link.status,
            reject_count: link.reject_count,
            eligibility: link.resend_eligibility(policy, now),
            remaining_attempts: link.remaining_attempts(policy),
        }
    }
}
