use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use treewatch::diff;
use treewatch::{
    stop, AuditLog, AuditRecord, Broker, ChangeKind, Consumer, ConsumerError, Event, FileMonitor,
    LoopErrorPolicy, WatcherConfig,
};

type Seen = Arc<Mutex<Vec<(String, Event)>>>;

fn capture(broker: &Broker, name: &str, pattern: &str) -> Seen {
    let seen = Seen::default();
    let sink = Arc::clone(&seen);
    broker.subscribe(
        Consumer::new(name, move |topic, event| {
            sink.lock().unwrap().push((topic.to_string(), event.clone()));
        })
        .shared(),
        pattern,
    );
    seen
}

#[test]
fn detects_create_modify_delete_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "stable\n").unwrap();
    fs::write(dir.path().join("edit.txt"), "one\ntwo\n").unwrap();
    fs::write(dir.path().join("drop.txt"), "bye\n").unwrap();

    let broker = Arc::new(Broker::new());
    let all = capture(&broker, "all", "~");
    let mut monitor = FileMonitor::new(Arc::clone(&broker), WatcherConfig::for_root(dir.path())).unwrap();

    // Pre-existing files are part of the initial snapshot.
    assert!(monitor.check_for_changes().unwrap().is_empty());

    fs::create_dir_all(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/new.txt"), "fresh\n").unwrap();
    fs::write(dir.path().join("edit.txt"), "one\nTWO\n").unwrap();
    fs::remove_file(dir.path().join("drop.txt")).unwrap();

    let report = monitor.check_for_changes().unwrap();
    assert_eq!((report.created, report.modified, report.deleted), (1, 1, 1));

    let seen = all.lock().unwrap();
    let kinds: Vec<(&str, ChangeKind)> = seen.iter().map(|(t, e)| (t.as_str(), e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("edit.txt", ChangeKind::Modified),
            ("sub/new.txt", ChangeKind::Created),
            ("drop.txt", ChangeKind::Deleted),
        ]
    );

    let modified = &seen[0].1;
    assert!(modified.content.is_empty());
    assert_eq!(diff::apply("one\ntwo\n", &modified.diff).unwrap(), "one\nTWO\n");

    let created = &seen[1].1;
    assert_eq!(created.content, "fresh\n");
    assert!(created.diff.is_empty());

    assert!(!monitor.snapshot().contains("drop.txt"));
    assert_eq!(monitor.snapshot().get("edit.txt"), Some("one\nTWO\n"));
}

#[test]
fn prefix_consumer_only_sees_its_subtree() {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(Broker::new());
    let important = capture(&broker, "important", "important/~");
    let all = capture(&broker, "all", "~");
    let mut monitor = FileMonitor::new(Arc::clone(&broker), WatcherConfig::for_root(dir.path())).unwrap();

    fs::create_dir_all(dir.path().join("important")).unwrap();
    fs::create_dir_all(dir.path().join("misc")).unwrap();
    fs::write(dir.path().join("important/x.txt"), "1").unwrap();
    fs::write(dir.path().join("misc/x.txt"), "2").unwrap();

    monitor.check_for_changes().unwrap();

    let important: Vec<String> = important.lock().unwrap().iter().map(|(t, _)| t.clone()).collect();
    assert_eq!(important, vec!["important/x.txt"]);
    assert_eq!(all.lock().unwrap().len(), 2);
}

#[test]
fn poll_loop_picks_up_changes_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let watched = dir.path().join("watched");
    fs::create_dir_all(&watched).unwrap();

    let broker = Arc::new(Broker::new());
    let all = capture(&broker, "all", "~");

    let cfg = WatcherConfig {
        interval: Duration::from_millis(10),
        ..WatcherConfig::for_root(&watched)
    };
    let mut monitor = FileMonitor::new(Arc::clone(&broker), cfg).unwrap();

    let (handle, token) = stop::channel();
    let worker = thread::spawn(move || monitor.start(&token));

    // Rename into place so a cycle never sees a half-written file.
    fs::write(dir.path().join("a.txt"), "hi").unwrap();
    fs::rename(dir.path().join("a.txt"), watched.join("a.txt")).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while all.lock().unwrap().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    handle.stop();
    worker.join().unwrap().unwrap();

    let seen = all.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "a.txt");
    assert_eq!(seen[0].1.kind, ChangeKind::Created);
}

#[test]
fn log_and_continue_keeps_polling_after_consumer_failure() {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(Broker::new());
    let failures = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&failures);
    broker.subscribe(
        Consumer::fallible("flaky", move |_, _| {
            *counter.lock().unwrap() += 1;
            Err(ConsumerError::new("always fails"))
        })
        .shared(),
        "~",
    );

    let cfg = WatcherConfig {
        interval: Duration::from_millis(10),
        on_consumer_error: LoopErrorPolicy::LogAndContinue,
        ..WatcherConfig::for_root(dir.path())
    };
    let mut monitor = FileMonitor::new(Arc::clone(&broker), cfg).unwrap();

    let (handle, token) = stop::channel();
    let worker = thread::spawn(move || monitor.start(&token));

    fs::write(dir.path().join("a.txt"), "1").unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while *failures.lock().unwrap() < 1 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    fs::write(dir.path().join("b.txt"), "2").unwrap();
    while *failures.lock().unwrap() < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    handle.stop();
    assert!(worker.join().unwrap().is_ok());
    assert!(*failures.lock().unwrap() >= 2);
}

#[test]
fn audit_log_records_every_change() {
    let dir = tempfile::tempdir().unwrap();
    let watched = dir.path().join("watched");
    fs::create_dir_all(&watched).unwrap();
    let audit_path = dir.path().join("audit.log");

    let broker = Arc::new(Broker::new());
    broker.subscribe(Arc::new(AuditLog::new("AuditLogger", &audit_path)), "~");
    let mut monitor = FileMonitor::new(Arc::clone(&broker), WatcherConfig::for_root(&watched)).unwrap();

    fs::write(watched.join("a.txt"), "1").unwrap();
    monitor.check_for_changes().unwrap();
    fs::remove_file(watched.join("a.txt")).unwrap();
    monitor.check_for_changes().unwrap();

    let records: Vec<AuditRecord> = fs::read_to_string(&audit_path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let summary: Vec<(&str, ChangeKind)> = records.iter().map(|r| (r.topic.as_str(), r.kind)).collect();
    assert_eq!(summary, vec![("a.txt", ChangeKind::Created), ("a.txt", ChangeKind::Deleted)]);
}
