use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::errors::ConsoleError;

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    /// Default for anything the caller did not classify
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

impl Default for NotificationKind {
    fn default() -> Self {
        NotificationKind::Error
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    /// Message key resolved by the text lookup layer
    pub key: String,
    /// Untranslated detail, e.g. the validation items behind a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            key: key.into(),
            detail: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn from_error(err: &ConsoleError) -> Self {
        let notification = Self::new(NotificationKind::Error, err.notification_key());
        match err {
            ConsoleError::Validation(_) => notification.with_detail(err.to_string()),
            _ => notification,
        }
    }
}

pub type NotificationBus = broadcast::Sender<Notification>;

pub fn init_notification_bus() -> (NotificationBus, broadcast::Receiver<Notification>) {
    broadcast::channel(256)
}

/// Publishes a notification. Having nobody listening is not an error.
pub fn publish(bus: &NotificationBus, notification: Notification) {
    tracing::debug!(
        kind = notification.kind.as_str(),
        key = %notification.key,
        "notification"
    );
    if bus.send(notification).is_err() {
        tracing::trace!("notification dropped: no subscribers");
    }
}

pub fn notify(bus: &NotificationBus, kind: NotificationKind, key: &str) {
    publish(bus, Notification::new(kind, key));
}

/// Logs a caught error and turns it into a notification.
pub fn report(bus: &NotificationBus, operation: &str, err: &ConsoleError) {
    tracing::warn!(operation = %operation, kind = err.kind(), "{}", err);
    publish(bus, Notification::from_error(err));
}

/// Drains everything currently queued on a receiver.
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(n) => out.push(n),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "notification receiver lagged");
            }
            Err(_) => break,
        }
    }
    out
}
