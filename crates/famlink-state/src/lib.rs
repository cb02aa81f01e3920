//! # famlink-state — Family Link State Machine
//!
//! Implements the sponsor/member linkage lifecycle as an enum with validated
//! transitions, following the same shape as every lifecycle record in the
//! workspace: a current state, guarded transition methods that return
//! `Result`, and an append-only transition log.
//!
//! ## States
//!
//! ```text
//! (absent) ──request──▶ INITIATED ──approve──▶ APPROVED
//!                        │     ▲                 │    │
//!                decline │     │ re-request      │    │ sponsor removes
//!                        ▼     │ (ceiling and    │    ▼
//!                      REJECTED   cooldown)      │  REVOKED ──re-request──▶ INITIATED
//!                        ▲                       │           (cooldown only)
//!                        └──── member leaves ────┘
//! ```
//!
//! - [`link`]: [`LinkStatus`], [`FamilyLink`] and its transitions.
//! - [`policy`]: [`LinkPolicy`] constants and [`ResendEligibility`], the
//!   pure cooldown / attempt-limit arithmetic shared by re-requests and
//!   outgoing-request listings.
//!
//! Nothing here performs I/O or reads the wall clock; every transition
//! takes the current instant explicitly.

pub mod link;
pub mod policy;

pub use link::{
    FamilyLink, LinkStatus, LinkTransitionEvidence, LinkTransitionRecord, TransitionError,
};
pub use policy::{LinkPolicy, PolicyError, ResendEligibility};
