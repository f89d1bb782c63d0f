//! Transient, non-blocking user notifications
//!
//! The sink is an append-only queue of timed messages. Concurrent messages
//! stack rather than overwrite; each expires after a fixed duration unless
//! dismissed first. The frontend polls `active()` and renders whatever is
//! still alive.

use crate::errors::RecorderError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default auto-dismiss window, matching the frontend toast policy.
pub const DEFAULT_DISMISS_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
    created: Instant,
    dismissed: bool,
}

impl Notification {
    fn remaining(&self, ttl: Duration) -> Option<Duration> {
        if self.dismissed {
            return None;
        }
        ttl.checked_sub(self.created.elapsed())
    }
}

/// Serializable snapshot of a live notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationInfo {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
    pub remaining_ms: u64,
}

/// Append-only queue of short-lived messages.
pub struct NotificationSink {
    queue: Mutex<VecDeque<Notification>>,
    ttl: Duration,
}

impl NotificationSink {
    pub fn new(ttl: Duration) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ttl,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DISMISS_MS))
    }

    /// Append a message. Returns its id for targeted dismissal.
    pub fn push(&self, severity: Severity, message: impl Into<String>) -> Uuid {
        let message = message.into();
        let id = Uuid::new_v4();
        log::debug!("notification [{:?}]: {}", severity, message);
        let mut queue = self.queue.lock().expect("notification queue poisoned");
        queue.push_back(Notification {
            id,
            severity,
            message,
            created: Instant::now(),
            dismissed: false,
        });
        id
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.push(Severity::Info, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.push(Severity::Error, message)
    }

    /// Translate a classified error into exactly one user-visible message.
    /// The raw cause is logged here and nowhere else.
    pub fn report(&self, err: &RecorderError) -> Uuid {
        log::error!("reported to user as '{}': {}", err.user_message(), err);
        self.push(err.severity(), err.user_message())
    }

    /// Messages still alive, oldest first. Expired and dismissed entries are
    /// pruned as a side effect.
    pub fn active(&self) -> Vec<NotificationInfo> {
        let ttl = self.ttl;
        let mut queue = self.queue.lock().expect("notification queue poisoned");
        queue.retain(|n| n.remaining(ttl).is_some());
        queue
            .iter()
            .map(|n| NotificationInfo {
                id: n.id,
                severity: n.severity,
                message: n.message.clone(),
                remaining_ms: n
                    .remaining(ttl)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0),
            })
            .collect()
    }

    /// User-initiated dismissal. Unknown ids are ignored.
    pub fn dismiss(&self, id: Uuid) {
        let mut queue = self.queue.lock().expect("notification queue poisoned");
        if let Some(n) = queue.iter_mut().find(|n| n.id == id) {
            n.dismissed = true;
        }
    }

    pub fn clear(&self) {
        self.queue
            .lock()
            .expect("notification queue poisoned")
            .clear();
    }

    /// Live message count (prunes as a side effect).
    pub fn len(&self) -> usize {
        self.active().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
