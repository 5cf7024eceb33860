//! # claimsched-events
//!
//! Best-effort, human-observable notification events.
//!
//! ## Design Principles
//!
//! - Events are observability, not correctness: recording is
//!   infallible by contract and failures inside an implementation are
//!   its own problem to swallow.
//! - Delivery is at-least-once; the scheduler emits intent before its
//!   conditional write, so an event may describe an attempt that a
//!   rival instance then wins.
//! - The default sink is a no-op so the scheduler is usable standalone
//!   and in tests without any wiring.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use claimsched_api::ClaimKey;
use serde::{Deserialize, Serialize};

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Expected operation of the scheduler.
    Normal,
    /// Something a human may want to look at.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Normal => write!(f, "normal"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single notification event about an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub severity: Severity,

    /// Stable machine-readable reason code (e.g. "SelectedResourceClass").
    pub reason: String,

    /// Human-readable message.
    pub message: String,

    /// Additional context key/value pairs.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// When the event was produced.
    pub recorded_at: DateTime<Utc>,
}

impl Event {
    /// Creates a normal-severity event.
    pub fn normal(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Normal, reason, message)
    }

    /// Creates a warning-severity event.
    pub fn warning(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, reason, message)
    }

    fn new(severity: Severity, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            reason: reason.into(),
            message: message.into(),
            attributes: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    /// Attaches a context attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Fire-and-forget sink for notification events.
///
/// Implementations must not block the caller for long and must not
/// panic; the scheduler ignores delivery entirely.
pub trait Recorder: Send + Sync {
    /// Records an event about the given claim.
    fn record(&self, subject: &ClaimKey, event: Event);
}

/// A recorder that drops every event. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopRecorder;

impl Recorder for NopRecorder {
    fn record(&self, _subject: &ClaimKey, _event: Event) {}
}

/// An event captured by [`MemoryRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub subject: ClaimKey,
    pub event: Event,
}

/// A recorder that keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns everything recorded so far.
    pub fn take(&self) -> Vec<RecordedEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Recorder for MemoryRecorder {
    fn record(&self, subject: &ClaimKey, event: Event) {
        self.lock().push(RecordedEvent {
            subject: subject.clone(),
            event,
        });
    }
}
