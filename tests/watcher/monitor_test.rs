//! Integration tests for the tail monitor.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use install_watch::watcher::{
    Classifier, LogEncoding, MonitorEvent, MonitorOptions, MonitorState, TailMonitor, WatchTarget,
};
use tokio_util::sync::CancellationToken;

fn options(poll_ms: u64, max_wait_ms: u64) -> MonitorOptions {
    MonitorOptions {
        poll_interval: Duration::from_millis(poll_ms),
        max_wait: Duration::from_millis(max_wait_ms),
        ..Default::default()
    }
}

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

#[tokio::test]
async fn monitor_waits_for_file_then_tails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build-tools-log.txt");

    let monitor = TailMonitor::new(
        WatchTarget::new(&path),
        Classifier::generic(),
        options(10, 5_000),
    );
    let handle = monitor.spawn();
    let mut state = handle.state_receiver();

    state
        .wait_for(|s| *s == MonitorState::WaitingForFile)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(handle.state(), MonitorState::WaitingForFile);

    append(&path, "Detect begin\n");
    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == MonitorState::Tailing),
    )
    .await
    .unwrap()
    .unwrap();

    append(&path, "[SUCCESS] installed at C:\\BuildTools\n");
    let event = handle.wait().await;
    assert_eq!(
        event,
        Some(MonitorEvent::Success {
            detail: Some("C:\\BuildTools".to_string())
        })
    );
    assert_eq!(*state.borrow(), MonitorState::Done);
}

#[tokio::test]
async fn missing_file_scenario_times_out_after_three_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = TailMonitor::new(
        WatchTarget::new(dir.path().join("never.log")),
        Classifier::generic(),
        options(10, 30),
    );

    let started = std::time::Instant::now();
    let event = monitor.run(CancellationToken::new()).await;
    let elapsed = started.elapsed();

    assert!(matches!(event, Some(MonitorEvent::Timeout { .. })));
    assert!(elapsed >= Duration::from_millis(30));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test]
async fn timeout_stops_polling() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quiet.log");
    append(&path, "nothing conclusive\n");

    let monitor = TailMonitor::new(WatchTarget::new(&path), Classifier::generic(), options(10, 50));
    let handle = monitor.spawn();
    let mut state = handle.state_receiver();

    state.wait_for(|s| *s == MonitorState::Done).await.unwrap();
    // A success line written after the timeout must not produce a second event.
    append(&path, "[SUCCESS]\n");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(handle.is_finished());
    assert!(matches!(
        handle.wait().await,
        Some(MonitorEvent::Timeout { .. })
    ));
}

#[tokio::test]
async fn failure_then_success_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    append(&path, "Apply begin\n");

    let monitor = TailMonitor::new(
        WatchTarget::new(&path),
        Classifier::generic(),
        options(10, 5_000),
    );
    let handle = monitor.spawn();
    let mut state = handle.state_receiver();
    state.wait_for(|s| *s == MonitorState::Tailing).await.unwrap();

    append(
        &path,
        "[FAILURE] see %TEMP%\\dd_setup.log\n[SUCCESS] installed at C:\\x\n",
    );

    assert_eq!(
        handle.wait().await,
        Some(MonitorEvent::Failure {
            detail: Some("see %TEMP%\\dd_setup.log".to_string())
        })
    );
}

#[tokio::test]
async fn lines_are_classified_only_when_complete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    append(&path, "[ERR");

    let monitor = TailMonitor::new(
        WatchTarget::new(&path),
        Classifier::generic(),
        options(10, 5_000),
    );
    let handle = monitor.spawn();
    tokio::time::sleep(Duration::from_millis(30)).await;
    append(&path, "OR] cannot continue");
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!handle.is_finished());

    append(&path, "\n");
    assert_eq!(
        handle.wait().await,
        Some(MonitorEvent::Error {
            detail: Some("cannot continue".to_string())
        })
    );
}

#[tokio::test]
async fn concurrent_monitors_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let build_log = dir.path().join("build-tools-log.txt");
    let python_log = dir.path().join("python-log.txt");

    let build = TailMonitor::new(
        WatchTarget::new(&build_log),
        Classifier::build_tools(),
        options(10, 5_000),
    )
    .spawn();
    let python = TailMonitor::new(
        WatchTarget::new(&python_log).with_encoding(LogEncoding::Utf16Le),
        Classifier::python(),
        options(10, 200),
    )
    .spawn();

    append(&build_log, "[0F6C:1E30]i001: Variable: IsInstalled = 1\n");

    let (build, python) = tokio::join!(build.wait(), python.wait());
    assert_eq!(build, Some(MonitorEvent::Success { detail: None }));
    assert!(matches!(python, Some(MonitorEvent::Timeout { .. })));
}

#[tokio::test]
async fn parent_cancellation_stops_spawned_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let parent = CancellationToken::new();

    let handle = TailMonitor::new(
        WatchTarget::new(dir.path().join("never.log")),
        Classifier::generic(),
        options(10, 60_000),
    )
    .spawn_with(parent.child_token());

    parent.cancel();
    let event = tokio::time::timeout(Duration::from_secs(2), handle.wait())
        .await
        .unwrap();
    assert!(event.is_none());
}

#[tokio::test]
async fn unbounded_wait_budget_still_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    append(&path, "[SUCCESS] installed at C:\\x\n");

    let monitor = TailMonitor::new(
        WatchTarget::new(&path),
        Classifier::generic(),
        MonitorOptions {
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(u64::MAX),
            ..Default::default()
        },
    );
    let event = tokio::time::timeout(Duration::from_secs(2), monitor.spawn().wait())
        .await
        .unwrap();

    assert_eq!(
        event,
        Some(MonitorEvent::Success {
            detail: Some("C:\\x".to_string())
        })
    );
}

#[tokio::test]
async fn zero_poll_interval_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    append(&path, "[SUCCESS]\n");

    let monitor = TailMonitor::new(
        WatchTarget::new(&path),
        Classifier::generic(),
        MonitorOptions {
            poll_interval: Duration::ZERO,
            max_wait: Duration::from_secs(5),
            ..Default::default()
        },
    );
    let event = tokio::time::timeout(Duration::from_secs(2), monitor.spawn().wait())
        .await
        .unwrap();

    assert_eq!(event, Some(MonitorEvent::Success { detail: None }));
}

#[tokio::test]
async fn zero_wait_budget_reads_existing_log_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    append(&path, "Detect begin\n[SUCCESS]\n");

    let monitor = TailMonitor::new(WatchTarget::new(&path), Classifier::generic(), options(10, 0));
    let event = monitor.run(CancellationToken::new()).await;

    assert_eq!(event, Some(MonitorEvent::Success { detail: None }));
}

#[tokio::test]
async fn unreadable_log_times_out_with_last_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    std::fs::create_dir(&path).unwrap();

    let monitor = TailMonitor::new(WatchTarget::new(&path), Classifier::generic(), options(10, 50));
    let handle = monitor.spawn();
    let state = handle.state_receiver();
    let event = handle.wait().await;

    match event {
        Some(MonitorEvent::Timeout {
            waited_ms,
            last_error: Some(last_error),
        }) => {
            assert!(waited_ms >= 50);
            assert!(last_error.contains("install.log"), "{last_error}");
        }
        other => panic!("expected timeout with a read error, got {other:?}"),
    }
    assert_eq!(*state.borrow(), MonitorState::Done);
}

#[tokio::test]
async fn unreadable_log_is_retried_until_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("install.log");
    std::fs::create_dir(&path).unwrap();

    let monitor = TailMonitor::new(
        WatchTarget::new(&path),
        Classifier::generic(),
        options(10, 5_000),
    );
    let handle = monitor.spawn();

    tokio::time::sleep(Duration::from_millis(50)).await;
    // The path exists, so the monitor is not waiting for a missing file.
    assert_eq!(handle.state(), MonitorState::Idle);
    assert!(!handle.is_finished());

    std::fs::remove_dir(&path).unwrap();
    append(&path, "[SUCCESS] installed at C:\\BuildTools\n");

    let event = tokio::time::timeout(Duration::from_secs(2), handle.wait())
        .await
        .unwrap();
    assert_eq!(
        event,
        Some(MonitorEvent::Success {
            detail: Some("C:\\BuildTools".to_string())
        })
    );
}
