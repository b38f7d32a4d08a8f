//! Tail monitor state machine.
//!
//! Polls a log file on a fixed interval, classifies every new line and
//! finishes with exactly one terminal event. Polling is used instead of
//! file-change notification so the monitor works on file systems that do
//! not report changes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::error::WatcherError;
use super::pattern::{Classification, Classifier};
use super::tailer::{LogTailer, TailRead, WatchTarget, DEFAULT_MAX_READ_BYTES};

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Current state of a tail monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MonitorState {
    #[default]
    Idle,
    WaitingForFile,
    Tailing,
    Done,
}

/// Polling cadence and limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Delay between read attempts.
    pub poll_interval: Duration,
    /// Total time allowed before the monitor gives up.
    pub max_wait: Duration,
    /// Upper bound on bytes read per tick.
    pub max_read_bytes: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(3600),
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }
}

/// Terminal event emitted once per monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum MonitorEvent {
    /// The log reported an internal installer error.
    Error { detail: Option<String> },
    /// The installer finished without installing.
    Failure { detail: Option<String> },
    /// The installer finished successfully.
    Success { detail: Option<String> },
    /// Nothing conclusive was logged within the wait budget.
    Timeout {
        waited_ms: u64,
        /// Last transient read error, if the file was unreadable.
        last_error: Option<String>,
    },
}

impl MonitorEvent {
    /// Convert a line classification into an event.
    ///
    /// Returns `None` for [`Classification::None`].
    #[must_use]
    pub fn from_classification(classification: Classification) -> Option<Self> {
        match classification {
            Classification::None => None,
            Classification::Error(detail) => Some(Self::Error { detail }),
            Classification::Failure(detail) => Some(Self::Failure { detail }),
            Classification::Success(detail) => Some(Self::Success { detail }),
        }
    }

    /// Short name of the outcome.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Failure { .. } => "failure",
            Self::Success { .. } => "success",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Get the detail extracted from the triggering line.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Error { detail } | Self::Failure { detail } | Self::Success { detail } => {
                detail.as_deref()
            }
            Self::Timeout { .. } => None,
        }
    }
}

/// Watches one log file until it reports an outcome.
#[derive(Debug)]
pub struct TailMonitor {
    tailer: LogTailer,
    classifier: Arc<Classifier>,
    options: MonitorOptions,
    state: watch::Sender<MonitorState>,
}

impl TailMonitor {
    /// Create a monitor for `target`.
    ///
    /// A poll interval below [`MIN_POLL_INTERVAL`] is raised to it.
    #[must_use]
    pub fn new(
        target: WatchTarget,
        classifier: impl Into<Arc<Classifier>>,
        mut options: MonitorOptions,
    ) -> Self {
        options.poll_interval = options.poll_interval.max(MIN_POLL_INTERVAL);
        let tailer = LogTailer::new(target).with_max_read_bytes(options.max_read_bytes);
        let (state, _) = watch::channel(MonitorState::Idle);
        Self {
            tailer,
            classifier: classifier.into(),
            options,
            state,
        }
    }

    #[must_use]
    pub fn target(&self) -> &WatchTarget {
        self.tailer.target()
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    fn transition(&self, new_state: MonitorState) {
        let old = self.state.send_replace(new_state);
        if old != new_state {
            tracing::debug!(
                path = %self.tailer.target().path().display(),
                from = ?old,
                to = ?new_state,
                "State transition"
            );
        }
    }

    /// Run until a terminal event, the wait budget elapses, or `cancel` fires.
    ///
    /// Returns `None` only when cancelled. Cancellation is observed between
    /// polls; a read already in progress finishes first. When the budget
    /// elapses the log is read one last time before reporting a timeout.
    /// A budget too large to represent as a deadline never expires.
    pub async fn run(mut self, cancel: CancellationToken) -> Option<MonitorEvent> {
        let started = Instant::now();
        let deadline = started.checked_add(self.options.max_wait);
        let watchdog = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(watchdog);

        let mut ticker = tokio::time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_error: Option<WatcherError> = None;

        let event = loop {
            let expired = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(
                        path = %self.target().path().display(),
                        "Monitor cancelled"
                    );
                    self.transition(MonitorState::Done);
                    return None;
                }
                () = &mut watchdog => true,
                _ = ticker.tick() => false,
            };

            match self.poll_once().await {
                Ok(Some(event)) => break event,
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        path = %self.target().path().display(),
                        error = %e,
                        "Log not readable, retrying next tick"
                    );
                    last_error = Some(e);
                }
            }

            if expired {
                break MonitorEvent::Timeout {
                    waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    last_error: last_error.map(|e| e.to_string()),
                };
            }
        };

        self.transition(MonitorState::Done);
        tracing::info!(
            path = %self.target().path().display(),
            outcome = event.kind(),
            detail = event.detail(),
            "Monitor finished"
        );
        Some(event)
    }

    /// Read once and classify the new lines in order.
    async fn poll_once(&mut self) -> Result<Option<MonitorEvent>, WatcherError> {
        let lines = match self.tailer.read_new_lines().await? {
            TailRead::Absent => {
                match self.state() {
                    MonitorState::Idle => self.transition(MonitorState::WaitingForFile),
                    MonitorState::Tailing => tracing::debug!(
                        path = %self.target().path().display(),
                        "Log disappeared while tailing"
                    ),
                    MonitorState::WaitingForFile | MonitorState::Done => {}
                }
                return Ok(None);
            }
            TailRead::Lines(lines) => lines,
        };

        self.transition(MonitorState::Tailing);

        for line in &lines {
            tracing::trace!(line = %line, "Classifying log line");
            if let Some(event) = MonitorEvent::from_classification(self.classifier.classify(line)) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    /// Spawn the monitor on the tokio runtime.
    #[must_use]
    pub fn spawn(self) -> MonitorHandle {
        self.spawn_with(CancellationToken::new())
    }

    /// Spawn the monitor, stopping it when `cancel` fires.
    #[must_use]
    pub fn spawn_with(self, cancel: CancellationToken) -> MonitorHandle {
        let (result_tx, result_rx) = oneshot::channel();
        let state = self.subscribe();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            if let Some(event) = self.run(token).await {
                let _ = result_tx.send(event);
            }
        });

        MonitorHandle {
            cancel: cancel.clone(),
            state,
            result: result_rx,
            task,
            _guard: cancel.drop_guard(),
        }
    }
}

/// Handle to a spawned monitor.
///
/// Dropping the handle cancels the monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    cancel: CancellationToken,
    state: watch::Receiver<MonitorState>,
    result: oneshot::Receiver<MonitorEvent>,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl MonitorHandle {
    /// Stop the monitor at its next poll boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Get a receiver for state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal event.
    ///
    /// Returns `None` if the monitor was cancelled or its task panicked.
    pub async fn wait(mut self) -> Option<MonitorEvent> {
        (&mut self.result).await.ok()
    }
}
