//! Change-detection engine.
//!
//! [`FileMonitor`] keeps the last snapshot of the watched tree. Each cycle it
//! captures a fresh snapshot, classifies the differences, and publishes one
//! event per changed file with the file's relative path as the topic:
//! created and modified files first, then deleted files.
//!
//! The retained snapshot is replaced as a whole before any event is
//! published. A consumer failure therefore aborts delivery for the rest of
//! the cycle but never leaves the engine holding a half-updated snapshot;
//! the undelivered changes are not re-emitted on the next cycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::broker::Broker;
use crate::diff::{self, DiffOptions};
use crate::error::{ValidationError, WatchError, WatchResult};
use crate::event::{ChangeKind, Event};
use crate::producer::Producer;
use crate::snapshot::{FileSource, LocalFileSource, Snapshot};
use crate::stop::StopToken;

/// What the polling loop does when a consumer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopErrorPolicy {
    /// Return the delivery error from `start`.
    #[default]
    Stop,
    /// Log the failure and keep polling.
    LogAndContinue,
}

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory to watch.
    pub root: PathBuf,
    /// Delay between polling cycles.
    pub interval: Duration,
    pub diff: DiffOptions,
    pub on_consumer_error: LoopErrorPolicy,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./file-server"),
            interval: Duration::from_secs(1),
            diff: DiffOptions::default(),
            on_consumer_error: LoopErrorPolicy::default(),
        }
    }
}

impl WatcherConfig {
    /// Config for `root` with every other setting at its default.
    #[must_use]
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Checks the config for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a zero interval or an empty root.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval.is_zero() {
            return Err(ValidationError::ZeroInterval);
        }
        if self.root.as_os_str().is_empty() {
            return Err(ValidationError::EmptyRoot);
        }
        Ok(())
    }
}

/// Per-cycle change counts.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl CycleReport {
    fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Created => self.created += 1,
            ChangeKind::Modified => self.modified += 1,
            ChangeKind::Deleted => self.deleted += 1,
        }
    }

    /// Number of events emitted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.created + self.modified + self.deleted
    }

    /// True if nothing changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Polling change detector publishing through a broker.
pub struct FileMonitor {
    cfg: WatcherConfig,
    source: Box<dyn FileSource>,
    producer: Producer,
    previous: Snapshot,
}

impl FileMonitor {
    /// Watches `cfg.root` on the local filesystem.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the config is invalid.
    pub fn new(broker: Arc<Broker>, cfg: WatcherConfig) -> WatchResult<Self> {
        let source = LocalFileSource::new(cfg.root.clone());
        Self::with_source(broker, Box::new(source), cfg)
    }

    /// Watches an arbitrary file source. The initial snapshot is taken here,
    /// so files already present are never reported as created.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the config is invalid.
    pub fn with_source(
        broker: Arc<Broker>,
        source: Box<dyn FileSource>,
        cfg: WatcherConfig,
    ) -> WatchResult<Self> {
        cfg.validate()?;
        let previous = Snapshot::capture(source.as_ref());
        debug!(root = %cfg.root.display(), files = previous.len(), "initial snapshot taken");
        Ok(Self {
            cfg,
            source,
            producer: Producer::new(broker),
            previous,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &WatcherConfig {
        &self.cfg
    }

    /// The snapshot the next cycle will compare against.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.previous
    }

    /// Runs one detection cycle.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Delivery` if a consumer fails while the cycle's
    /// events are published.
    pub fn check_for_changes(&mut self) -> WatchResult<CycleReport> {
        let current = Snapshot::capture(self.source.as_ref());
        let changes = Snapshot::changes(&self.previous, &current);

        let mut report = CycleReport::default();
        let mut pending = Vec::with_capacity(changes.len());

        for change in changes {
            let event = match change.kind {
                ChangeKind::Created => Event::created(current.get(&change.path).unwrap_or_default()),
                ChangeKind::Modified => Event::modified(diff::unified(
                    self.previous.get(&change.path).unwrap_or_default(),
                    current.get(&change.path).unwrap_or_default(),
                    &self.cfg.diff,
                )),
                ChangeKind::Deleted => Event::deleted(),
            };
            info!(path = %change.path, kind = %change.kind, "file change detected");
            report.record(change.kind);
            pending.push((change.path, event));
        }

        self.previous = current;

        for (path, event) in &pending {
            self.producer.publish(path, event)?;
        }

        Ok(report)
    }

    /// Polls until `stop` fires.
    ///
    /// # Errors
    ///
    /// Under [`LoopErrorPolicy::Stop`], returns the first consumer failure.
    pub fn start(&mut self, stop: &StopToken) -> WatchResult<()> {
        info!(
            root = %self.cfg.root.display(),
            interval_ms = u64::try_from(self.cfg.interval.as_millis()).unwrap_or(u64::MAX),
            "starting file monitoring"
        );

        while !stop.is_stopped() {
            match self.check_for_changes() {
                Ok(report) if !report.is_empty() => {
                    debug!(
                        created = report.created,
                        modified = report.modified,
                        deleted = report.deleted,
                        "cycle complete"
                    );
                }
                Ok(_) => {}
                Err(WatchError::Delivery(err))
                    if self.cfg.on_consumer_error == LoopErrorPolicy::LogAndContinue =>
                {
                    error!(error = %err, "consumer failed, continuing to poll");
                }
                Err(err) => {
                    error!(error = %err, "stopping file monitoring after failure");
                    return Err(err);
                }
            }

            if stop.wait_timeout(self.cfg.interval) {
                break;
            }
        }

        info!(root = %self.cfg.root.display(), "stopping file monitoring");
        Ok(())
    }
}

impl std::fmt::Debug for FileMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMonitor")
            .field("cfg", &self.cfg)
            .field("files", &self.previous.len())
            .finish_non_exhaustive()
    }
}
