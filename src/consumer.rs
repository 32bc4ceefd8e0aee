//! Consumers receive published events.
//!
//! Anything implementing [`Subscriber`] can be registered with a broker.
//! [`Consumer`] is the common case: a name plus a callback.

use std::fmt;
use std::sync::Arc;

use crate::error::ConsumerResult;
use crate::event::Event;

/// Capability to receive events published on a topic.
///
/// Implementations must not assume exclusive access: the same subscriber may
/// be registered under several patterns and invoked once per match.
pub trait Subscriber: Send + Sync {
    /// Identifier used in logs and delivery errors.
    fn name(&self) -> &str;

    /// Handles one event. A returned error is propagated to the publisher.
    fn receive(&self, topic: &str, event: &Event) -> ConsumerResult;
}

type Callback = dyn Fn(&str, &Event) -> ConsumerResult + Send + Sync;

/// A named callback adapter.
///
/// No buffering and no concurrency control: `receive` calls the callback
/// directly on the publishing thread.
#[derive(Clone)]
pub struct Consumer {
    name: String,
    callback: Arc<Callback>,
}

impl Consumer {
    /// Wraps an infallible callback.
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str, &Event) + Send + Sync + 'static,
    {
        Self::fallible(name, move |topic, event| {
            callback(topic, event);
            Ok(())
        })
    }

    /// Wraps a callback that may fail.
    pub fn fallible<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str, &Event) -> ConsumerResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }

    /// Shares this consumer so it can be subscribed under several patterns.
    #[must_use]
    pub fn shared(self) -> Arc<dyn Subscriber> {
        Arc::new(self)
    }
}

impl Subscriber for Consumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&self, topic: &str, event: &Event) -> ConsumerResult {
        (self.callback)(topic, event)
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("name", &self.name).finish_non_exhaustive()
    }
}
