//! Link mutations as values, and the result of committing one.
//!
//! [`LifecycleEngine::commit`](crate::LifecycleEngine::commit) applies a
//! [`LinkCommand`] to the link store and hands back a
//! [`CommittedTransition`]. Nothing has been sent to anyone yet. A caller
//! with a durable backend writes the link through first, then either
//! publishes the transition (notification goes out) or reverts it.

use famlink_adapters::NotificationTopic;
use famlink_core::{AccountCode, AccountId};
use famlink_state::FamilyLink;

/// One mutating lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Sponsor asks to link the member owning `member_code`.
    Request {
        sponsor_id: AccountId,
        member_code: AccountCode,
    },
    /// Member approves or declines a pending request.
    Decide {
        member_id: AccountId,
        sponsor_id: AccountId,
        approve: bool,
    },
    /// Sponsor removes an approved member. `acting_account` performs the call.
    RemoveMember {
        sponsor_id: AccountId,
        member_id: AccountId,
        acting_account: AccountId,
    },
    /// Member leaves an approved link.
    RemoveSponsor {
        member_id: AccountId,
        sponsor_id: AccountId,
    },
}

impl LinkCommand {
    /// Operation name used in logs and metrics.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Request { .. } => "request_link",
            Self::Decide { .. } => "decide",
            Self::RemoveMember { .. } => "remove_member",
            Self::RemoveSponsor { .. } => "remove_sponsor",
        }
    }
}

/// A transition written to the link store whose notification is held back.
///
/// Hand it to [`LifecycleEngine::publish`](crate::LifecycleEngine::publish)
/// once the link is durable, or to
/// [`LifecycleEngine::revert`](crate::LifecycleEngine::revert) if it is not.
#[derive(Debug, Clone)]
#[must_use = "a committed transition must be published or reverted"]
pub struct CommittedTransition {
    pub(crate) link: FamilyLink,
    pub(crate) previous: Option<FamilyLink>,
    pub(crate) notification: Option<PendingNotification>,
}

impl CommittedTransition {
    /// The record as stored.
    pub fn link(&self) -> &FamilyLink {
        &self.link
    }

    /// The active record of the pair before this transition, if there was one.
    pub fn previous(&self) -> Option<&FamilyLink> {
        self.previous.as_ref()
    }

    /// Recipient and topic of the held-back notification.
    pub fn notification(&self) -> Option<&PendingNotification> {
        self.notification.as_ref()
    }
}

/// A notification owed to `recipient` once its transition is durable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub recipient: AccountId,
    pub topic: NotificationTopic,
}
