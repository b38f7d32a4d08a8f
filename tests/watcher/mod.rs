//! Watcher module tests.

mod monitor_test;
mod tailer_test;

/// Verify all public watcher types are exported from the library.
#[test]
fn test_all_watcher_types_exported() {
    use install_watch::watcher::{
        Classification, Classifier, LogEncoding, LogTailer, MonitorEvent, MonitorOptions,
        MonitorState, ReadCursor, Recognizer, TailMonitor, TailRead, Verdict, WatchTarget,
        WatcherError,
    };

    let target = WatchTarget::new("/tmp/install.log").with_encoding(LogEncoding::Utf16Le);
    let _ = LogTailer::new(target.clone());
    let _ = TailMonitor::new(target, Classifier::generic(), MonitorOptions::default());
    let _ = ReadCursor::default();
    let _ = Recognizer::new(Verdict::Success, "done", "test");

    let _ = Classification::None;
    let _ = MonitorState::WaitingForFile;
    let _ = TailRead::Absent;
    let _: fn() -> MonitorEvent = || MonitorEvent::Success { detail: None };
    let _: fn(std::io::Error) -> WatcherError = WatcherError::Io;
}
