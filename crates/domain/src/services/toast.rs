//! Bounded toast notification queue.
//!
//! Toasts are short user-facing messages. The queue is owned by the
//! application state and shared explicitly with whoever needs to raise one;
//! expiry is driven by the caller through [`ToastQueue::expire`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Default number of toasts kept at once.
pub const DEFAULT_TOAST_CAPACITY: usize = 5;

/// Default lifetime of a toast in milliseconds.
pub const DEFAULT_TOAST_TTL_MS: i64 = 4_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ToastQueue {
    capacity: usize,
    ttl: Duration,
    next_id: u64,
    toasts: VecDeque<Toast>,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(
            DEFAULT_TOAST_CAPACITY,
            Duration::milliseconds(DEFAULT_TOAST_TTL_MS),
        )
    }
}

impl ToastQueue {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            next_id: 1,
            toasts: VecDeque::new(),
        }
    }

    /// Queue a toast stamped with the current time.
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) -> u64 {
        self.push_at(kind, message, Utc::now())
    }

    /// Queue a toast created at `now`, dropping the oldest when full.
    pub fn push_at(&mut self, kind: ToastKind, message: impl Into<String>, now: DateTime<Utc>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        while self.toasts.len() >= self.capacity {
            self.toasts.pop_front();
        }

        self.toasts.push_back(Toast {
            id,
            kind,
            message: message.into(),
            created_at: now,
            expires_at: now + self.ttl,
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Error, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Info, message)
    }

    /// Drop every toast whose expiry is at or before `now`. Returns how many
    /// were removed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.expires_at > now);
        before - self.toasts.len()
    }

    /// Remove one toast. Returns false when the id is unknown.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        before != self.toasts.len()
    }

    /// Current toasts, oldest first.
    pub fn active(&self) -> Vec<Toast> {
        self.toasts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// Toast queue shared between the studio, intake and HTTP handlers.
#[derive(Debug, Clone, Default)]
pub struct SharedToasts(Arc<Mutex<ToastQueue>>);

impl SharedToasts {
    pub fn new(queue: ToastQueue) -> Self {
        Self(Arc::new(Mutex::new(queue)))
    }

    /// Lock the queue. A poisoned lock still yields the queue; toasts are
    /// advisory and never left half-updated.
    pub fn lock(&self) -> MutexGuard<'_, ToastQueue> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.lock().success(message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.lock().error(message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.lock().info(message)
    }

    /// Expire stale toasts and return what is left.
    pub fn current(&self) -> Vec<Toast> {
        let mut queue = self.lock();
        queue.expire(Utc::now());
        queue.active()
    }

    pub fn dismiss(&self, id: u64) -> bool {
        self.lock().dismiss(id)
    }
}
