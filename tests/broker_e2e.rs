use std::sync::{Arc, Mutex};

use treewatch::topic::matches;
use treewatch::{
    Broker, BrokerConfig, ChangeKind, Consumer, ConsumerError, DeliveryError, DeliveryPolicy,
    Event, FileMonitor, MemoryFileSource, Subscriber, WatcherConfig,
};

/// Structured handler used alongside closure consumers.
struct Counter {
    hits: Mutex<Vec<String>>,
}

impl Subscriber for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn receive(&self, topic: &str, _event: &Event) -> treewatch::ConsumerResult {
        self.hits.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}

#[test]
fn important_prefix_routes_only_matching_topics() {
    let broker = Broker::new();
    let counter = Arc::new(Counter {
        hits: Mutex::new(Vec::new()),
    });
    broker.subscribe(counter.clone(), "important/~");

    assert_eq!(broker.publish("important/x.txt", &Event::created("a")).unwrap(), 1);
    assert_eq!(broker.publish("misc/x.txt", &Event::created("b")).unwrap(), 0);

    assert_eq!(*counter.hits.lock().unwrap(), vec!["important/x.txt"]);
}

#[test]
fn one_consumer_under_several_patterns_receives_once_per_match() {
    let broker = Broker::new();
    let counter = Arc::new(Counter {
        hits: Mutex::new(Vec::new()),
    });
    broker.subscribe(counter.clone(), "~");
    broker.subscribe(counter.clone(), "logs/~");
    broker.subscribe(counter.clone(), "logs/app.log");

    assert_eq!(broker.publish("logs/app.log", &Event::deleted()).unwrap(), 3);
    assert_eq!(broker.publish("logs/other.log", &Event::deleted()).unwrap(), 2);
    assert_eq!(broker.publish("readme", &Event::deleted()).unwrap(), 1);
    assert_eq!(counter.hits.lock().unwrap().len(), 6);
}

#[test]
fn free_function_and_broker_agree() {
    let patterns = ["~", "a/~", "a/b", "", "b~"];
    let topics = ["a/b", "a/c", "b", "bb", "c"];

    for pattern in patterns {
        let broker = Broker::new();
        let counter = Arc::new(Counter {
            hits: Mutex::new(Vec::new()),
        });
        broker.subscribe(counter.clone(), pattern);

        for topic in topics {
            let delivered = broker.publish(topic, &Event::deleted()).unwrap();
            assert_eq!(delivered == 1, matches(topic, pattern), "topic {topic:?} pattern {pattern:?}");
        }
    }
}

#[test]
fn isolate_policy_reports_every_failure_but_delivers_to_healthy_consumers() {
    let broker = Broker::with_config(BrokerConfig {
        delivery: DeliveryPolicy::Isolate,
    });
    let counter = Arc::new(Counter {
        hits: Mutex::new(Vec::new()),
    });
    broker.subscribe(
        Consumer::fallible("broken", |_, _| Err(ConsumerError::new("boom"))).shared(),
        "~",
    );
    broker.subscribe(counter.clone(), "~");

    let err = broker.publish("a.txt", &Event::deleted()).unwrap_err();
    match err {
        DeliveryError::Consumer { consumer, .. } => assert_eq!(consumer, "broken"),
        other => panic!("expected single failure, got {other:?}"),
    }
    assert_eq!(counter.hits.lock().unwrap().len(), 1);
}

#[test]
fn monitor_drives_consumers_from_memory_source() {
    let broker = Arc::new(Broker::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    broker.subscribe(
        Consumer::new("capture", move |topic, event| {
            sink.lock().unwrap().push((topic.to_string(), event.kind));
        })
        .shared(),
        "~",
    );

    let fs = Arc::new(MemoryFileSource::with_files([("a.txt", "hi")]));
    let mut monitor = FileMonitor::with_source(
        Arc::clone(&broker),
        Box::new(Arc::clone(&fs)),
        WatcherConfig::for_root("in-memory"),
    )
    .unwrap();

    fs.write("a.txt", "bye");
    monitor.check_for_changes().unwrap();
    fs.remove("a.txt");
    monitor.check_for_changes().unwrap();
    monitor.check_for_changes().unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("a.txt".to_string(), ChangeKind::Modified),
            ("a.txt".to_string(), ChangeKind::Deleted),
        ]
    );
}
