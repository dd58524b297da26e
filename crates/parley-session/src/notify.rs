//! Transient user-facing notifications.
//!
//! Rendering is up to the embedding UI: subscribe to the
//! [`NotificationCenter`] or poll [`NotificationCenter::active`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// How prominent a notification is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Fire-and-forget alert sink
pub trait Notifier: Send + Sync {
    /// Show `message` for `duration_ms` milliseconds (0 keeps it until dismissed)
    fn notify(&self, message: &str, severity: Severity, duration_ms: u64);
}

/// A displayed notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub duration_ms: u64,
    expires_at: Option<Instant>,
}

impl Notification {
    /// Whether the notification has timed out at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process notification list with timed expiry
pub struct NotificationCenter {
    next_id: AtomicU64,
    active: Mutex<Vec<Notification>>,
    tx: broadcast::Sender<Notification>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            next_id: AtomicU64::new(1),
            active: Mutex::new(Vec::new()),
            tx,
        }
    }

    /// Receive every notification as it is raised
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Raise a notification and return its id
    pub fn push(&self, message: impl Into<String>, severity: Severity, duration_ms: u64) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let expires_at =
            (duration_ms > 0).then(|| Instant::now() + Duration::from_millis(duration_ms));
        let notification = Notification {
            id,
            message: message.into(),
            severity,
            duration_ms,
            expires_at,
        };
        self.active.lock().push(notification.clone());
        let _ = self.tx.send(notification);
        id
    }

    /// Remove a notification. Unknown or already removed ids are ignored.
    pub fn dismiss(&self, id: u64) {
        self.active.lock().retain(|n| n.id != id);
    }

    /// Notifications still on screen, oldest first
    pub fn active(&self) -> Vec<Notification> {
        let now = Instant::now();
        let mut active = self.active.lock();
        active.retain(|n| !n.is_expired_at(now));
        active.clone()
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, message: &str, severity: Severity, duration_ms: u64) {
        self.push(message, severity, duration_ms);
    }
}
