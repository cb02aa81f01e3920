//! # famlink-core — Foundational Types
//!
//! Shared primitives for every famlink crate. Depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `AccountId`, `AccountCode` and
//!    `LinkId` are distinct types with validated constructors. A member code
//!    can never be passed where an account id is expected.
//!
//! 2. **UTC-only timestamps.** [`Timestamp`] is UTC, truncated to seconds,
//!    and carries the whole-day arithmetic used by cooldown rules.
//!
//! 3. **Injectable time.** Code that needs "now" takes a [`Clock`] so that
//!    cooldown behaviour is testable without sleeping.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `famlink-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{AccountCode, AccountId, LinkId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
