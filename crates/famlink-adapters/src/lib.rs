//! # famlink-adapters — Collaborator Contracts
//!
//! The linkage engine touches the rest of the platform through exactly two
//! narrow interfaces:
//!
//! - [`DirectoryAdapter`] (inbound): resolves an account by its shareable
//!   code or by its id, returning display name and contact completeness.
//! - [`NotifierAdapter`] (outbound): fire-and-forget notifications on
//!   approve, revoke and self-removal.
//!
//! Both traits are object-safe and `Send + Sync` so the engine can hold
//! them as `Arc<dyn ...>` and swap implementations at runtime (in-process
//! for development and tests, platform services in production).

pub mod directory;
pub mod notifier;

pub use directory::{
    AccountProfile, AccountSummary, DirectoryAdapter, DirectoryError, InMemoryDirectory,
};
pub use notifier::{
    Notification, NotificationTopic, NotifierAdapter, NotifyError, RecordingNotifier,
    TracingNotifier,
};
