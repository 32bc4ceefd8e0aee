//! Producer: the publishing side used by the change-detection engine.

use std::sync::Arc;

use crate::broker::Broker;
use crate::error::DeliveryError;
use crate::event::{ChangeKind, Event};

/// Builds timestamped events and publishes them through a shared broker.
#[derive(Debug, Clone)]
pub struct Producer {
    broker: Arc<Broker>,
}

impl Producer {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new(broker: Arc<Broker>) -> Self {
        Self { broker }
    }

    /// The broker events are published to.
    #[must_use]
    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Publishes a prebuilt event under `topic`.
    ///
    /// # Errors
    ///
    /// Propagates consumer failures from [`Broker::publish`].
    pub fn publish(&self, topic: &str, event: &Event) -> Result<usize, DeliveryError> {
        self.broker.publish(topic, event)
    }

    /// Stamps a change with the current time and publishes it under `path`.
    ///
    /// # Errors
    ///
    /// Propagates consumer failures from [`Broker::publish`].
    pub fn publish_change(
        &self,
        path: &str,
        kind: ChangeKind,
        diff: String,
        content: String,
    ) -> Result<usize, DeliveryError> {
        let event = match kind {
            ChangeKind::Created => Event::created(content),
            ChangeKind::Modified => Event::modified(diff),
            ChangeKind::Deleted => Event::deleted(),
        };
        self.publish(path, &event)
    }
}
