//! Ready-made consumers.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consumer::Subscriber;
use crate::error::ConsumerResult;
use crate::event::{ChangeKind, Event, EventId};

/// Logs every received change, including its diff, at `info` level.
#[derive(Debug, Clone)]
pub struct ChangeLogger {
    name: String,
}

impl ChangeLogger {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Subscriber for ChangeLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&self, topic: &str, event: &Event) -> ConsumerResult {
        info!(
            consumer = %self.name,
            topic,
            kind = %event.kind,
            time = %event.time.to_rfc3339(),
            diff = %event.diff,
            "change received"
        );
        Ok(())
    }
}

/// One line of the audit log.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub time: DateTime<Utc>,
    pub topic: String,
    pub kind: ChangeKind,
    pub event_id: EventId,
}

/// Appends one JSON line per received event to a file.
///
/// Write failures are returned to the broker as consumer errors.
#[derive(Debug)]
pub struct AuditLog {
    name: String,
    path: PathBuf,
    // Serializes appends when the broker is shared across threads.
    lock: Mutex<()>,
}

impl AuditLog {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// File records are appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Subscriber for AuditLog {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&self, topic: &str, event: &Event) -> ConsumerResult {
        let record = AuditRecord {
            time: event.time,
            topic: topic.to_string(),
            kind: event.kind,
            event_id: event.id,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_log_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new("AuditLogger", dir.path().join("audit.log"));

        let first = Event::created("x");
        let second = Event::deleted();
        audit.receive("a.txt", &first).unwrap();
        audit.receive("b/c.txt", &second).unwrap();

        let text = std::fs::read_to_string(audit.path()).unwrap();
        let records: Vec<AuditRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].topic, "a.txt");
        assert_eq!(records[0].kind, ChangeKind::Created);
        assert_eq!(records[0].event_id, first.id);
        assert_eq!(records[1].topic, "b/c.txt");
        assert_eq!(records[1].kind, ChangeKind::Deleted);
    }

    #[test]
    fn audit_log_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let audit = AuditLog::new("AuditLogger", dir.path());
        let err = audit.receive("a.txt", &Event::deleted()).unwrap_err();
        assert!(!err.message().is_empty());
    }

    #[test]
    fn change_logger_never_fails() {
        let logger = ChangeLogger::new("FileChangeLogger");
        assert_eq!(logger.name(), "FileChangeLogger");
        logger.receive("a.txt", &Event::modified("-a\n+b")).unwrap();
    }
}
