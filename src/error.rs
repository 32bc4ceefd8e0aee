//! Error types for treewatch.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the specific failure. File access problems during snapshotting are
//! deliberately absent: unreadable files are recorded with empty content
//! and never reach the caller.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Validation errors raised while checking configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    #[error("Watched root path cannot be empty")]
    EmptyRoot,
}

/// Failure reported by a consumer from its `receive` callback.
///
/// Consumers either build one from a message or wrap an underlying error.
#[derive(Debug)]
pub struct ConsumerError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl ConsumerError {
    /// Creates a consumer error from a plain message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying error, keeping it as the error source.
    #[must_use]
    pub fn from_source(err: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Human readable failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConsumerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ConsumerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for ConsumerError {
    fn from(err: std::io::Error) -> Self {
        Self::from_source(err)
    }
}

impl From<serde_json::Error> for ConsumerError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_source(err)
    }
}

/// Errors raised by `Broker::publish` when consumers fail.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Consumer '{consumer}' failed on topic '{topic}': {source}")]
    Consumer {
        consumer: String,
        topic: String,
        #[source]
        source: ConsumerError,
    },

    #[error("{} consumers failed on topic '{topic}'", failures.len())]
    Multiple {
        topic: String,
        failures: Vec<DeliveryError>,
    },
}

impl DeliveryError {
    /// Topic the failed publish was addressed to.
    #[must_use]
    pub fn topic(&self) -> &str {
        match self {
            Self::Consumer { topic, .. } | Self::Multiple { topic, .. } => topic,
        }
    }

    /// Number of consumer failures carried by this error.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        match self {
            Self::Consumer { .. } => 1,
            Self::Multiple { failures, .. } => failures.len(),
        }
    }
}

/// Error returned when a textual diff cannot be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("Malformed hunk header at line {line}: {text}")]
    MalformedHeader {
        line: usize,
        text: String,
    },

    #[error("Unexpected diff line {line}: {text}")]
    UnexpectedLine {
        line: usize,
        text: String,
    },

    #[error("Hunk at line {line} does not match the original content")]
    ContextMismatch {
        line: usize,
    },
}

/// Top-level error type for treewatch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl WatchError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if a consumer failed during delivery.
    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

/// Result type alias for treewatch operations.
pub type WatchResult<T> = Result<T, WatchError>;

/// Result returned by consumer callbacks.
pub type ConsumerResult = Result<(), ConsumerError>;
