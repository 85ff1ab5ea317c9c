//! Notifications — the toast-style side channel for operation outcomes.

use tokio::sync::broadcast;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A short, non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
}

impl Notification {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            text: text.into(),
        }
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => tracing::info!(notice = %notification.text, "Notification"),
            NotificationLevel::Error => tracing::warn!(notice = %notification.text, "Notification"),
        }
    }
}

/// Fans notifications out to every subscriber.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        // No subscribers is fine.
        let _ = self.tx.send(notification);
    }
}
