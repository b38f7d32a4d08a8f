//! Configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::watcher::{
    Classifier, LogEncoding, MonitorOptions, PatternError, Recognizer, Verdict, WatchTarget,
    DEFAULT_MAX_READ_BYTES,
};

/// Polling configuration shared by every monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between reads of the log, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Seconds to wait for an outcome before giving up.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Maximum bytes read from a log per poll.
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_wait_secs() -> u64 {
    3600
}

fn default_max_read_bytes() -> usize {
    DEFAULT_MAX_READ_BYTES
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
            max_read_bytes: default_max_read_bytes(),
        }
    }
}

impl MonitorConfig {
    /// Build monitor options from this configuration.
    #[must_use]
    pub fn to_options(&self) -> MonitorOptions {
        MonitorOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            max_wait: Duration::from_secs(self.max_wait_secs),
            max_read_bytes: self.max_read_bytes,
        }
    }
}

/// A user-defined recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub verdict: Verdict,
    /// Regex; a `detail` capture group becomes the event detail.
    pub pattern: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RuleConfig {
    /// Compile this rule.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::InvalidPattern` if the regex is invalid.
    pub fn to_recognizer(&self) -> Result<Recognizer, PatternError> {
        let description = self
            .description
            .clone()
            .unwrap_or_else(|| format!("custom {} rule", self.verdict));
        Recognizer::new(self.verdict, &self.pattern, description)
    }
}

/// Visual Studio Build Tools bootstrapper log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildToolsConfig {
    /// Log path; defaults to `build-tools-log.txt` in the work directory.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub encoding: LogEncoding,
}

/// Python msiexec log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PythonConfig {
    /// Log path; defaults to `python-log.txt` in the work directory.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default = "default_python_encoding")]
    pub encoding: LogEncoding,
    /// Install directory reported when the log does not name one.
    #[serde(default)]
    pub target_path: Option<PathBuf>,
}

fn default_python_encoding() -> LogEncoding {
    LogEncoding::Utf16Le
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            encoding: default_python_encoding(),
            target_path: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Directory holding installers and their logs.
    pub work_dir: PathBuf,
    pub monitor: MonitorConfig,
    pub build_tools: BuildToolsConfig,
    pub python: PythonConfig,
    /// Extra recognizers for the generic classifier.
    pub rules: Vec<RuleConfig>,
}

fn default_work_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".windows-build-tools")
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            monitor: MonitorConfig::default(),
            build_tools: BuildToolsConfig::default(),
            python: PythonConfig::default(),
            rules: Vec::new(),
        }
    }
}

impl InstallConfig {
    #[must_use]
    pub fn build_tools_log(&self) -> PathBuf {
        self.build_tools
            .log_path
            .clone()
            .unwrap_or_else(|| self.work_dir.join("build-tools-log.txt"))
    }

    #[must_use]
    pub fn python_log(&self) -> PathBuf {
        self.python
            .log_path
            .clone()
            .unwrap_or_else(|| self.work_dir.join("python-log.txt"))
    }

    /// Directory Python is installed into unless the log says otherwise.
    #[must_use]
    pub fn python_install_dir(&self) -> PathBuf {
        self.python
            .target_path
            .clone()
            .unwrap_or_else(|| self.work_dir.join("python27"))
    }

    #[must_use]
    pub fn build_tools_target(&self) -> WatchTarget {
        WatchTarget::new(self.build_tools_log()).with_encoding(self.build_tools.encoding)
    }

    #[must_use]
    pub fn python_target(&self) -> WatchTarget {
        WatchTarget::new(self.python_log()).with_encoding(self.python.encoding)
    }

    /// Directory shown to the user when an installer fails.
    #[must_use]
    pub fn log_dir_for(&self, log_path: &Path) -> PathBuf {
        log_path
            .parent()
            .map_or_else(|| self.work_dir.clone(), Path::to_path_buf)
    }

    /// Extend `base` with the configured rules, keeping verdict precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured pattern is not a valid regex.
    pub fn classifier_with_rules(&self, mut base: Classifier) -> Result<Classifier, PatternError> {
        let extra = self
            .rules
            .iter()
            .map(RuleConfig::to_recognizer)
            .collect::<Result<Vec<_>, _>>()?;
        if !extra.is_empty() {
            base.extend_ordered(extra);
        }
        Ok(base)
    }
}
