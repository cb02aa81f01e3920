//! # famlink-store — Link Store
//!
//! Durable keyed storage of [`FamilyLink`] records, one per ordered
//! `(sponsor, member)` pair.
//!
//! ## Contract
//!
//! - At most one **active** record exists per pair. [`LinkStore::upsert`]
//!   is the synchronization point that guarantees this.
//! - `upsert` is an atomic compare-and-swap on [`FamilyLink::version`]:
//!   version `0` means "insert", any other value means "update the record
//!   I read". A losing concurrent writer gets [`StoreError::Conflict`] and
//!   is expected to re-read and re-decide.
//! - Inactive (archived) records are never returned by queries and never
//!   physically deleted.
//!
//! [`InMemoryLinkStore`] is the process-local implementation. Durable
//! backends write committed records through from the layer above.

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::InMemoryLinkStore;

use famlink_core::{AccountId, LinkId};
use famlink_state::{FamilyLink, LinkStatus};

/// Status filter for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every active record.
    Any,
    /// Records in exactly this status.
    Only(LinkStatus),
    /// Records not currently approved.
    NotApproved,
}

impl StatusFilter {
    /// Whether `status` passes the filter.
    pub fn matches(&self, status: LinkStatus) -> bool {
        match self {
            Self::Any => true,
            Self::Only(wanted) => status == *wanted,
            Self::NotApproved => status != LinkStatus::Approved,
        }
    }
}

/// Keyed storage of family links.
///
/// Implementations must be `Send + Sync` so one store can back every
/// request handler behind an `Arc`.
pub trait LinkStore: Send + Sync {
    /// The active record for the ordered pair, if any.
    ///
    /// Returns [`StoreError::DuplicatePair`] when more than one active
    /// record exists for the pair.
    fn find_by_pair(
        &self,
        sponsor_id: &AccountId,
        member_id: &AccountId,
    ) -> Result<Option<FamilyLink>, StoreError>;

    /// Atomically create or update a record, returning what was stored.
    fn upsert(&self, link: &FamilyLink) -> Result<FamilyLink, StoreError>;

    /// Active records where `sponsor_id` is the sponsor, oldest first.
    fn list_by_sponsor(
        &self,
        sponsor_id: &AccountId,
        filter: StatusFilter,
    ) -> Result<Vec<FamilyLink>, StoreError>;

    /// Active records where `member_id` is the member, oldest first.
    fn list_by_member(
        &self,
        member_id: &AccountId,
        filter: StatusFilter,
    ) -> Result<Vec<FamilyLink>, StoreError>;

    /// A record by surrogate id, active or not.
    fn get(&self, id: LinkId) -> Result<Option<FamilyLink>, StoreError>;

    /// Mark a record inactive. The record is kept for its history.
    fn archive(&self, id: LinkId) -> Result<FamilyLink, StoreError>;
}
