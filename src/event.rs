//! Change events delivered to consumers.
//!
//! An event is an immutable value describing one detected change. The
//! payload rules are fixed per kind:
//!
//! - `Created`: `content` carries the full new content, `diff` is empty
//! - `Modified`: `diff` carries the unified diff, `content` is empty
//! - `Deleted`: both are empty

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an event.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new random event id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// File appeared since the previous snapshot.
    Created,
    /// File content changed since the previous snapshot.
    Modified,
    /// File disappeared since the previous snapshot.
    Deleted,
}

impl ChangeKind {
    /// Lowercase name used in logs and serialized events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected file change.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: ChangeKind,
    pub time: DateTime<Utc>,
    pub diff: String,
    pub content: String,
}

impl Event {
    /// Event for a newly created file.
    #[must_use]
    pub fn created(content: impl Into<String>) -> Self {
        Self::at(ChangeKind::Created, Utc::now(), String::new(), content.into())
    }

    /// Event for a modified file.
    #[must_use]
    pub fn modified(diff: impl Into<String>) -> Self {
        Self::at(ChangeKind::Modified, Utc::now(), diff.into(), String::new())
    }

    /// Event for a deleted file.
    #[must_use]
    pub fn deleted() -> Self {
        Self::at(ChangeKind::Deleted, Utc::now(), String::new(), String::new())
    }

    /// Builds an event with an explicit detection time.
    ///
    /// Callers are expected to respect the per-kind payload rules; the
    /// engine only ever builds events through the kind constructors.
    #[must_use]
    pub fn at(kind: ChangeKind, time: DateTime<Utc>, diff: String, content: String) -> Self {
        Self {
            id: EventId::new(),
            kind,
            time,
            diff,
            content,
        }
    }

    /// Detection time as fractional seconds since the Unix epoch.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn timestamp_secs(&self) -> f64 {
        self.time.timestamp_millis() as f64 / 1000.0
    }
}
