//! Transient user notifications.
//!
//! # Design
//! - `notify` is fire-and-forget: it records the entry, broadcasts it and
//!   schedules its own removal on the current tokio runtime.
//! - Entries never stack-merge; each call is a distinct notification with its
//!   own id, listed in creation order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::debug;

/// Default on-screen lifetime of a notification.
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(3000);

const EVENT_CAPACITY: usize = 64;

/// Visual severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Neutral information.
    Info,
    /// Operation succeeded.
    Success,
    /// Needs attention but nothing failed.
    Warning,
    /// Operation failed.
    Danger,
}

impl Severity {
    /// Stable label used in logs and machine output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

/// A single displayed notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Monotonic identifier, unique per center.
    pub id: u64,
    /// Message shown to the user.
    pub message: String,
    /// Visual severity.
    pub severity: Severity,
    /// Time on screen before automatic dismissal.
    pub duration: Duration,
}

/// Lifecycle events published to renderers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A notification became visible.
    Shown(Notification),
    /// A notification was removed, either manually or on expiry.
    Dismissed {
        /// Identifier of the removed notification.
        id: u64,
    },
}

/// Owner of the visible notification list.
#[derive(Clone, Debug)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    next_id: AtomicU64,
    default_duration: Duration,
    active: Mutex<BTreeMap<u64, Notification>>,
    events: broadcast::Sender<NotificationEvent>,
}

impl Inner {
    fn active(&self) -> MutexGuard<'_, BTreeMap<u64, Notification>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dismiss(&self, id: u64) -> bool {
        let removed = self.active().remove(&id).is_some();
        if removed {
            let _ = self.events.send(NotificationEvent::Dismissed { id });
        }
        removed
    }
}

impl NotificationCenter {
    /// Create a center using `default_duration` for [`Self::notify`].
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                default_duration,
                active: Mutex::new(BTreeMap::new()),
                events,
            }),
        }
    }

    /// Show a notification for the default duration.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> u64 {
        self.notify_for(message, severity, self.inner.default_duration)
    }

    /// Show a notification for an explicit duration.
    pub fn notify_for(
        &self,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
    ) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let notification = Notification {
            id,
            message: message.into(),
            severity,
            duration,
        };
        debug!(id, severity = severity.as_str(), message = %notification.message, "notification shown");
        self.inner.active().insert(id, notification.clone());
        let _ = self.inner.events.send(NotificationEvent::Shown(notification));
        self.schedule_dismissal(id, duration);
        id
    }

    /// Informational shorthand.
    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.notify(message, Severity::Info)
    }

    /// Success shorthand.
    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.notify(message, Severity::Success)
    }

    /// Warning shorthand.
    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.notify(message, Severity::Warning)
    }

    /// Failure shorthand.
    pub fn danger(&self, message: impl Into<String>) -> u64 {
        self.notify(message, Severity::Danger)
    }

    /// Remove a notification before it expires. Unknown ids are ignored.
    pub fn dismiss(&self, id: u64) -> bool {
        self.inner.dismiss(id)
    }

    /// Visible notifications in creation order.
    #[must_use]
    pub fn active(&self) -> Vec<Notification> {
        self.inner.active().values().cloned().collect()
    }

    /// Observe notification lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.events.subscribe()
    }

    fn schedule_dismissal(&self, id: u64, duration: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(id, "no runtime available; notification stays until dismissed");
            return;
        };
        let inner = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = inner.upgrade() {
                inner.dismiss(id);
            }
        });
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_DURATION)
    }
}
