//! Link store error types.

use famlink_core::{AccountId, LinkId};
use thiserror::Error;

/// Errors from [`LinkStore`](crate::LinkStore) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A concurrent writer changed the pair first. Re-read and retry.
    #[error("concurrent write conflict on link {sponsor_id} -> {member_id}")]
    Conflict {
        sponsor_id: AccountId,
        member_id: AccountId,
    },

    /// More than one active record exists for a pair.
    #[error("{count} active links found for {sponsor_id} -> {member_id}")]
    DuplicatePair {
        sponsor_id: AccountId,
        member_id: AccountId,
        count: usize,
    },

    /// No record with this id.
    #[error("link {0} not found")]
    NotFound(LinkId),

    /// An update tried to move a record to a different pair.
    #[error("link {0} cannot change its sponsor or member")]
    PairChanged(LinkId),
}
