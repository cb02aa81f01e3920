//! # Notifier Adapter
//!
//! Outbound notifications about link lifecycle events. Delivery is
//! best-effort: the engine logs failures and never rolls back a committed
//! transition because a notification could not be sent.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use famlink_core::AccountId;

/// The kind of event being notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationTopic {
    /// A member accepted a link request. Sent to the sponsor.
    MemberAddition,
    /// A sponsor removed an approved member. Sent to the member.
    MemberDeletion,
    /// A member left an approved link. Sent to the sponsor.
    SelfDeletion,
}

impl NotificationTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MemberAddition => "MEMBER_ADDITION",
            Self::MemberDeletion => "MEMBER_DELETION",
            Self::SelfDeletion => "SELF_DELETION",
        }
    }
}

impl std::fmt::Display for NotificationTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single notification addressed to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: AccountId,
    pub topic: NotificationTopic,
    /// Template parameters (`sponsor_name`, `member_name`, `link_id`).
    pub params: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(recipient: AccountId, topic: NotificationTopic) -> Self {
        Self {
            recipient,
            topic,
            params: BTreeMap::new(),
        }
    }

    /// Attach a template parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Errors from notification delivery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Outbound notification sink.
pub trait NotifierAdapter: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name of this adapter implementation.
    fn adapter_name(&self) -> &str;
}

/// Emits each notification as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotifierAdapter for TracingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notification.recipient,
            topic = %notification.topic,
            params = ?notification.params,
            "notification dispatched"
        );
        Ok(())
    }

    fn adapter_name(&self) -> &str {
        "TracingNotifier"
    }
}

/// Keeps every notification in memory. Can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (without recording them).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of delivered notifications, oldest first.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Delivered notifications with the given topic.
    pub fn sent_with_topic(&self, topic: NotificationTopic) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.topic == topic)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl NotifierAdapter for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery(format!(
                "recording notifier set to fail ({})",
                notification.topic
            )));
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }

    fn adapter_name(&self) -> &str {
        "RecordingNotifier"
    }
}
