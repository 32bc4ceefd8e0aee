//! # treewatch - structured change events for a directory tree
//!
//! treewatch polls a directory, diffs each new snapshot against the last one,
//! and publishes one event per changed file through an in-process topic
//! broker. Consumers receive created/modified/deleted events carrying either
//! the new content or a unified diff, never raw file bytes.
//!
//! ## Core Concepts
//!
//! - **Topic**: a file path relative to the watched root
//! - **Pattern**: `"~"` (everything), `"prefix~"` (prefix match) or an exact topic
//! - **Broker**: subscription table plus synchronous fan-out
//! - **FileMonitor**: the snapshot-diff engine driving the broker
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use treewatch::{stop, Broker, Consumer, FileMonitor, WatcherConfig};
//!
//! let broker = Arc::new(Broker::new());
//! broker.subscribe(
//!     Consumer::new("printer", |topic, event| println!("{topic}: {}", event.kind)).shared(),
//!     "important/~",
//! );
//!
//! let mut monitor = FileMonitor::new(Arc::clone(&broker), WatcherConfig::for_root("./watched"))?;
//! let (_handle, token) = stop::channel();
//! monitor.start(&token)?;
//! # Ok::<(), treewatch::WatchError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Publish/subscribe
pub mod broker;
pub mod consumer;
pub mod consumers;
pub mod event;
pub mod producer;
pub mod topic;

// Change detection
pub mod diff;
pub mod snapshot;
pub mod stop;
pub mod watcher;

pub mod error;

// Re-export primary types at crate root for convenience
pub use broker::{Broker, BrokerConfig, DeliveryPolicy};
pub use consumer::{Consumer, Subscriber};
pub use consumers::{AuditLog, AuditRecord, ChangeLogger};
pub use diff::DiffOptions;
pub use error::{
    ApplyError, ConsumerError, ConsumerResult, DeliveryError, ValidationError, WatchError,
    WatchResult,
};
pub use event::{ChangeKind, Event, EventId};
pub use producer::Producer;
pub use snapshot::{Change, FileSource, LocalFileSource, MemoryFileSource, Snapshot};
pub use stop::{StopHandle, StopToken};
pub use topic::TopicPattern;
pub use watcher::{CycleReport, FileMonitor, LoopErrorPolicy, WatcherConfig};
