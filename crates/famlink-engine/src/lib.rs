//! # famlink-engine — Lifecycle Engine
//!
//! Ties the state machine in `famlink-state` to a [`LinkStore`], a
//! [`DirectoryAdapter`] and a [`NotifierAdapter`].
//!
//! | Operation | Effect |
//! |---|---|
//! | [`LifecycleEngine::request_link`] | absent → `INITIATED`, or re-request |
//! | [`LifecycleEngine::decide`] | `INITIATED` → `APPROVED` / `REJECTED` |
//! | [`LifecycleEngine::remove_member`] | `APPROVED` → `REVOKED` |
//! | [`LifecycleEngine::remove_sponsor`] | `APPROVED` → `REJECTED` |
//! | [`LifecycleEngine::list_members`] | approved links, sponsor side |
//! | [`LifecycleEngine::list_sponsors`] | approved links, member side |
//! | [`LifecycleEngine::list_outgoing_non_approved`] | sponsor's pending and failed requests |
//! | [`LifecycleEngine::list_incoming_pending`] | requests awaiting the member |
//! | [`LifecycleEngine::get_link`] | raw record of a pair |
//! | [`LifecycleEngine::check_eligibility`] | whether a re-request would pass now |
//!
//! Each mutation is also a [`LinkCommand`]. [`LifecycleEngine::commit`]
//! writes it to the store and returns a [`CommittedTransition`] whose
//! notification waits for [`LifecycleEngine::publish`]; a caller that
//! fails to make the write durable calls [`LifecycleEngine::revert`]
//! instead. The named operations above commit and publish in one step.
//!
//! Store conflicts are retried up to [`EngineConfig::max_conflict_retries`]
//! times. Directory failures are surfaced. Notifier failures are logged and
//! dropped.
//!
//! [`LinkStore`]: famlink_store::LinkStore
//! [`DirectoryAdapter`]: famlink_adapters::DirectoryAdapter
//! [`NotifierAdapter`]: famlink_adapters::NotifierAdapter

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod view;

pub use command::{CommittedTransition, LinkCommand, PendingNotification};
pub use config::EngineConfig;
pub use engine::LifecycleEngine;
pub use error::LinkError;
pub use view::{EligibilityReport, LinkView};
