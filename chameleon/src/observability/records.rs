//! Log records produced by the hook logger and plugins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// What a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// A tap invocation.
    Hook,
    /// A resource load or parse.
    Resource,
    /// A render frame.
    Frame,
    /// An error outside any tap.
    Error,
    /// Free-form information.
    Info,
    /// A context change.
    Ctx,
}

/// How the described operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    /// Completed without error.
    Ok,
    /// Failed; see [`LogEntry::error`].
    Error,
}

/// One log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique record id.
    pub id: Uuid,
    /// Record kind.
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// Outcome.
    pub status: LogStatus,
    /// Hook name, for hook records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    /// Plugin (tap) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// When the operation started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    /// When the operation settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Wall time spent, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Arbitrary structured data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error message, for failed operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEntry {
    /// Creates a successful record of `kind`.
    #[must_use]
    pub fn new(kind: LogKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: LogStatus::Ok,
            hook: None,
            plugin: None,
            start: None,
            end: None,
            duration_ms: None,
            payload: None,
            error: None,
        }
    }

    /// Creates a record for a tap invocation.
    #[must_use]
    pub fn hook(hook: impl Into<String>, plugin: impl Into<String>) -> Self {
        let mut entry = Self::new(LogKind::Hook);
        entry.hook = Some(hook.into());
        entry.plugin = Some(plugin.into());
        entry
    }

    /// Creates an informational record.
    #[must_use]
    pub fn info(payload: serde_json::Value) -> Self {
        Self::new(LogKind::Info).with_payload(payload)
    }

    /// Sets start, end and duration.
    #[must_use]
    pub fn timed(mut self, start: DateTime<Utc>, end: DateTime<Utc>, elapsed: Duration) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self.duration_ms = Some(elapsed.as_secs_f64() * 1000.0);
        self
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Marks the record failed with `error`.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.status = LogStatus::Error;
        self.error = Some(error.into());
        self
    }

    /// Returns true if the record describes a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == LogStatus::Error
    }
}
