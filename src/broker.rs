//! Topic broker.
//!
//! The broker owns the subscription table (pattern -> ordered consumers) and
//! fans published events out synchronously on the caller's thread.
//!
//! Delivery order is fixed: patterns in the order they were first
//! subscribed, then consumers in the order they were added under that
//! pattern. Subscribing the same consumer twice under one pattern delivers
//! every matching event to it twice.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{trace, warn};

use crate::consumer::Subscriber;
use crate::error::DeliveryError;
use crate::event::Event;
use crate::topic::TopicPattern;

/// How `publish` reacts to a failing consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Stop at the first failure and return it; remaining consumers are skipped.
    #[default]
    FailFast,
    /// Deliver to every matching consumer, then report all failures together.
    Isolate,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    pub delivery: DeliveryPolicy,
}

struct Subscription {
    pattern: TopicPattern,
    consumers: Vec<Arc<dyn Subscriber>>,
}

#[derive(Default)]
struct SubscriptionTable {
    entries: Vec<Subscription>,
    index: HashMap<String, usize>,
}

/// In-process publish/subscribe broker.
///
/// `subscribe` and `publish` both take `&self`, so a broker is usually
/// shared behind an `Arc`. `publish` copies the matching consumers out of the
/// table before delivering, which lets a consumer subscribe or publish on
/// the same broker from inside `receive`. Subscriptions added during a
/// publish do not see that publish.
pub struct Broker {
    cfg: BrokerConfig,
    table: RwLock<SubscriptionTable>,
}

impl Broker {
    /// Creates a broker with the default fail-fast delivery policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn with_config(cfg: BrokerConfig) -> Self {
        Self {
            cfg,
            table: RwLock::new(SubscriptionTable::default()),
        }
    }

    /// Active delivery policy.
    #[must_use]
    pub fn delivery_policy(&self) -> DeliveryPolicy {
        self.cfg.delivery
    }

    /// Appends `consumer` to the subscriber list for `pattern`.
    ///
    /// Never fails and never deduplicates.
    pub fn subscribe(&self, consumer: Arc<dyn Subscriber>, pattern: &str) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);

        trace!(consumer = consumer.name(), pattern, "subscribe");

        if let Some(&slot) = table.index.get(pattern) {
            table.entries[slot].consumers.push(consumer);
            return;
        }

        let slot = table.entries.len();
        table.entries.push(Subscription {
            pattern: TopicPattern::parse(pattern),
            consumers: vec![consumer],
        });
        table.index.insert(pattern.to_string(), slot);
    }

    /// Publishes `event` under `topic` to every matching consumer.
    ///
    /// Returns the number of successful deliveries. Publishing with no
    /// matching subscription delivers nothing and is not an error.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` if a consumer fails. Under
    /// [`DeliveryPolicy::FailFast`] the first failure aborts delivery; under
    /// [`DeliveryPolicy::Isolate`] all failures are collected.
    pub fn publish(&self, topic: &str, event: &Event) -> Result<usize, DeliveryError> {
        let targets = self.matching_consumers(topic);
        if targets.is_empty() {
            trace!(topic, "no matching subscriptions");
            return Ok(0);
        }

        let mut delivered = 0;
        let mut failures = Vec::new();

        for consumer in targets {
            match consumer.receive(topic, event) {
                Ok(()) => delivered += 1,
                Err(source) => {
                    let err = DeliveryError::Consumer {
                        consumer: consumer.name().to_string(),
                        topic: topic.to_string(),
                        source,
                    };
                    match self.cfg.delivery {
                        DeliveryPolicy::FailFast => return Err(err),
                        DeliveryPolicy::Isolate => {
                            warn!(consumer = consumer.name(), topic, error = %err, "consumer failed, continuing delivery");
                            failures.push(err);
                        }
                    }
                }
            }
        }

        match failures.len() {
            0 => Ok(delivered),
            1 => Err(failures.remove(0)),
            _ => Err(DeliveryError::Multiple {
                topic: topic.to_string(),
                failures,
            }),
        }
    }

    /// Consumers that would receive an event on `topic`, in delivery order.
    fn matching_consumers(&self, topic: &str) -> Vec<Arc<dyn Subscriber>> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .entries
            .iter()
            .filter(|sub| sub.pattern.matches(topic))
            .flat_map(|sub| sub.consumers.iter().cloned())
            .collect()
    }

    /// Registered patterns in first-subscription order.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .entries
            .iter()
            .map(|sub| sub.pattern.as_pattern_string())
            .collect()
    }

    /// Number of registrations under exactly `pattern` (duplicates counted).
    #[must_use]
    pub fn subscriber_count(&self, pattern: &str) -> usize {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .index
            .get(pattern)
            .map_or(0, |&slot| table.entries[slot].consumers.len())
    }

    /// Total number of registrations across all patterns.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.entries.iter().map(|sub| sub.consumers.len()).sum()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("cfg", &self.cfg)
            .field("patterns", &self.patterns())
            .finish()
    }
}
