//! Watcher module for installer log files.
//!
//! Tails a log written by an external installer and reduces it to a
//! single terminal outcome.

mod encoding;
mod error;
mod monitor;
mod pattern;
mod tailer;

pub use encoding::{DecodedLines, LogEncoding, UnknownEncoding};
pub use error::WatcherError;
pub use monitor::{
    MonitorEvent, MonitorHandle, MonitorOptions, MonitorState, TailMonitor, MIN_POLL_INTERVAL,
};
pub use pattern::{Classification, Classifier, PatternError, Recognizer, Verdict};
pub use tailer::{LogTailer, ReadCursor, TailRead, WatchTarget, DEFAULT_MAX_READ_BYTES};
