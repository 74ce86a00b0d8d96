use super::*;
use std::sync::mpsc;

type Log = Arc<Mutex<Vec<String>>>;

fn setup() -> (Arc<Coordinator>, Arc<ManualClock>, Log) {
    let clock = Arc::new(ManualClock::new());
    let statuses: Log = Arc::new(Mutex::new(Vec::new()));
    let sink_log = statuses.clone();
    let sink = Arc::new(move |key: &str, status: &SaveStatus| {
        sink_log.lock().unwrap().push(format!("{}:{:?}", key, status));
    });
    let config = CoordinatorConfig {
        debounce_ms: 100,
        retry_delay_ms: 10,
    };
    let coordinator = Coordinator::new(&config)
        .with_clock(clock.clone())
        .with_sink(sink);
    (Arc::new(coordinator), clock, statuses)
}

fn recorder(log: &Log, label: &str) -> Producer {
    let log = log.clone();
    let label = label.to_string();
    Box::new(move || {
        log.lock().unwrap().push(label);
        Ok(())
    })
}

#[test]
fn test_burst_is_coalesced_into_latest_write() {
    let (coord, clock, _) = setup();
    let writes: Log = Arc::default();

    for label in ["v1", "v2", "v3"] {
        coord.schedule("note", recorder(&writes, label));
        clock.advance(Duration::from_millis(40));
    }
    assert_eq!(coord.run_due(), 0);

    clock.advance(Duration::from_millis(100));
    assert_eq!(coord.run_due(), 1);
    assert_eq!(*writes.lock().unwrap(), vec!["v3"]);
    assert_eq!(coord.state("note"), KeyState::Idle);
}

#[test]
fn test_edit_during_persist_becomes_pending() {
    let (coord, clock, _) = setup();
    let writes: Log = Arc::default();
    let seen_state = Arc::new(Mutex::new(None));

    let inner = coord.clone();
    let inner_writes = writes.clone();
    let inner_seen = seen_state.clone();
    coord.schedule_persist(
        "note",
        Box::new(move || {
            inner_writes.lock().unwrap().push("first".to_string());
            inner.schedule("note", recorder(&inner_writes, "stale"));
            inner.schedule("note", recorder(&inner_writes, "latest"));
            *inner_seen.lock().unwrap() = Some(inner.state("note"));
            Ok(())
        }),
        Duration::ZERO,
    );

    assert_eq!(coord.run_due(), 1);
    assert_eq!(
        *seen_state.lock().unwrap(),
        Some(KeyState::InFlightWithPending)
    );
    assert!(matches!(coord.state("note"), KeyState::Scheduled { .. }));

    // The queued request waits for the retry delay, not the full debounce
    clock.advance(Duration::from_millis(10));
    assert_eq!(coord.run_due(), 1);
    assert_eq!(*writes.lock().unwrap(), vec!["first", "latest"]);
}

#[test]
fn test_flush_now_skips_the_delay() {
    let (coord, _, _) = setup();
    let writes: Log = Arc::default();

    coord.schedule("note", recorder(&writes, "v1"));
    assert!(coord.flush_now("note").unwrap());
    assert_eq!(*writes.lock().unwrap(), vec!["v1"]);

    assert!(!coord.flush_now("note").unwrap());
    assert!(!coord.flush_now("other").unwrap());
}

#[test]
fn test_status_sequence_and_no_automatic_retry() {
    let (coord, clock, statuses) = setup();

    coord.schedule("a", Box::new(|| Ok(())));
    coord.flush_now("a").unwrap();

    coord.schedule(
        "b",
        Box::new(|| Err(QuireError::IoFailure("disk full".to_string()))),
    );
    clock.advance(Duration::from_millis(100));
    assert_eq!(coord.run_due(), 1);
    assert_eq!(coord.state("b"), KeyState::Idle);

    clock.advance(Duration::from_secs(10));
    assert_eq!(coord.run_due(), 0);

    let statuses = statuses.lock().unwrap();
    assert_eq!(
        *statuses,
        vec![
            "a:Pending",
            "a:Saving",
            "a:Saved",
            "b:Pending",
            "b:Saving",
            "b:Error(\"storage failure: disk full\")",
        ]
    );
}

#[test]
fn test_flush_now_returns_error_of_last_attempt() {
    let (coord, _, _) = setup();
    coord.schedule(
        "note",
        Box::new(|| Err(QuireError::IoFailure("gone".to_string()))),
    );
    let err = coord.flush_now("note").unwrap_err();
    assert!(matches!(err, QuireError::IoFailure(_)));
}

#[test]
fn test_panicking_producer_releases_its_key() {
    let (coord, clock, statuses) = setup();
    coord.schedule(
        "note",
        Box::new(|| -> Result<()> { panic!("render blew up") }),
    );

    let err = coord.flush_now("note").unwrap_err();
    assert!(matches!(err, QuireError::IoFailure(ref m) if m.contains("render blew up")));
    assert_eq!(coord.state("note"), KeyState::Idle);
    assert!(statuses
        .lock()
        .unwrap()
        .last()
        .is_some_and(|s| s.starts_with("note:Error(")));

    // The next edit is persisted normally
    let writes: Log = Arc::default();
    coord.schedule("note", recorder(&writes, "after"));
    clock.advance(Duration::from_millis(100));
    assert_eq!(coord.run_due(), 1);
    assert_eq!(*writes.lock().unwrap(), vec!["after"]);
}

#[test]
fn test_flush_now_waits_for_in_flight_then_runs_pending() {
    let (coord, _, _) = setup();
    let writes: Log = Arc::default();
    let (started_tx, started_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();

    let slow_writes = writes.clone();
    coord.schedule_persist(
        "note",
        Box::new(move || {
            started_tx.send(()).unwrap();
            go_rx.recv().unwrap();
            slow_writes.lock().unwrap().push("slow".to_string());
            Ok(())
        }),
        Duration::ZERO,
    );

    let runner = {
        let coord = coord.clone();
        std::thread::spawn(move || coord.run_due())
    };
    started_rx.recv().unwrap();
    assert_eq!(coord.state("note"), KeyState::InFlight);

    coord.schedule("note", recorder(&writes, "pending"));
    let flusher = {
        let coord = coord.clone();
        std::thread::spawn(move || coord.flush_now("note"))
    };

    go_tx.send(()).unwrap();
    assert_eq!(runner.join().unwrap(), 1);
    assert!(flusher.join().unwrap().unwrap());

    assert_eq!(*writes.lock().unwrap(), vec!["slow", "pending"]);
    assert_eq!(coord.state("note"), KeyState::Idle);
}

#[test]
fn test_flush_all_attempts_every_key() {
    let (coord, _, _) = setup();
    let writes: Log = Arc::default();

    coord.schedule("a", recorder(&writes, "a"));
    coord.schedule("b", Box::new(|| Err(QuireError::IoFailure("x".to_string()))));
    coord.schedule("c", recorder(&writes, "c"));

    assert!(coord.flush_all().is_err());
    let mut written = writes.lock().unwrap().clone();
    written.sort();
    assert_eq!(written, vec!["a", "c"]);
    assert_eq!(coord.active_keys(), 0);
}

#[test]
fn test_next_deadline_is_earliest_schedule() {
    let (coord, clock, _) = setup();
    let t0 = clock.now();
    coord.schedule_persist("late", Box::new(|| Ok(())), Duration::from_millis(500));
    coord.schedule_persist("soon", Box::new(|| Ok(())), Duration::from_millis(20));
    assert_eq!(coord.next_deadline(), Some(t0 + Duration::from_millis(20)));
}

#[test]
fn test_driver_flushes_on_shutdown() {
    let writes: Log = Arc::default();
    let coord = Arc::new(Coordinator::new(&CoordinatorConfig {
        debounce_ms: 60_000,
        retry_delay_ms: 10,
    }));
    let driver = CoordinatorDriver::spawn(coord.clone(), Duration::from_millis(5)).unwrap();

    coord.schedule("note", recorder(&writes, "final"));
    assert_eq!(driver.shutdown().unwrap(), 1);
    assert_eq!(*writes.lock().unwrap(), vec!["final"]);
}
