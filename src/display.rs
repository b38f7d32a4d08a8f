//! Colored CLI display utilities for installer status output.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::watcher::MonitorEvent;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for details echoed from a log line.
const DEFAULT_MAX_LEN: usize = 200;

/// Truncate a string to a maximum length, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Human-readable wait duration, e.g. `1h 02m 05s`.
#[must_use]
pub fn format_waited(waited_ms: u64) -> String {
    let secs = waited_ms / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{}.{:03}s", s, waited_ms % 1000)
    }
}

/// Print the banner shown while installers run.
pub fn print_waiting(build_tools_log: &Path, python_log: &Path) {
    let ts = timestamp();
    println!(
        "{} {} Waiting for installers to finish. This will likely take some time - please be patient!",
        ts.dimmed(),
        "[WAIT]".blue().bold()
    );
    println!(
        "{} {} build tools log: {}",
        ts.dimmed(),
        "[WAIT]".blue().bold(),
        build_tools_log.display().dimmed()
    );
    println!(
        "{} {} python log: {}",
        ts.dimmed(),
        "[WAIT]".blue().bold(),
        python_log.display().dimmed()
    );
    let _ = io::stdout().flush();
}

pub fn print_installer_success(name: &str, path: Option<&Path>) {
    let path = path.map_or(String::new(), |p| format!(" ({})", p.display()));
    println!(
        "{} {} {}{}",
        timestamp().dimmed(),
        "[SUCCESS]".green().bold(),
        format!("Successfully installed {name}.").green().bold(),
        path.dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print a failed installation and where to find its logs.
pub fn print_installer_failure(name: &str, log_dir: &Path) {
    let ts = timestamp();
    println!(
        "{} {} {}",
        ts.dimmed(),
        "[FAILURE]".red().bold(),
        format!("Could not install {name}.").red().bold()
    );
    println!(
        "{} {} Please find more details in the log files, which can be found at {}",
        ts.dimmed(),
        "[FAILURE]".red().bold(),
        log_dir.display().cyan()
    );
    let _ = io::stdout().flush();
}

pub fn print_installer_error(name: &str, detail: Option<&str>) {
    println!(
        "{} {} {} installer reported an error: {}",
        timestamp().dimmed(),
        "[ERROR]".red().bold(),
        name,
        truncate(detail.unwrap_or("no details"), DEFAULT_MAX_LEN).red()
    );
    let _ = io::stdout().flush();
}

pub fn print_installer_timeout(name: &str, waited_ms: u64) {
    println!(
        "{} {} Gave up waiting for {} after {}.",
        timestamp().dimmed(),
        "[TIMEOUT]".yellow().bold(),
        name,
        format_waited(waited_ms).yellow()
    );
    let _ = io::stdout().flush();
}

/// Print the terminal event of a single tailed log.
pub fn print_event(path: &Path, event: &MonitorEvent) {
    let ts = timestamp();
    let detail = event
        .detail()
        .map_or(String::new(), |d| format!(": {}", truncate(d, DEFAULT_MAX_LEN)));
    match event {
        MonitorEvent::Success { .. } => println!(
            "{} {} {}{}",
            ts.dimmed(),
            "[SUCCESS]".green().bold(),
            path.display(),
            detail.green()
        ),
        MonitorEvent::Failure { .. } => println!(
            "{} {} {}{}",
            ts.dimmed(),
            "[FAILURE]".red().bold(),
            path.display(),
            detail.red()
        ),
        MonitorEvent::Error { .. } => println!(
            "{} {} {}{}",
            ts.dimmed(),
            "[ERROR]".red().bold(),
            path.display(),
            detail.red()
        ),
        MonitorEvent::Timeout {
            waited_ms,
            last_error,
        } => {
            println!(
                "{} {} {} reported nothing after {}",
                ts.dimmed(),
                "[TIMEOUT]".yellow().bold(),
                path.display(),
                format_waited(*waited_ms).yellow()
            );
            if let Some(err) = last_error {
                println!(
                    "{} {} last read error: {}",
                    ts.dimmed(),
                    "[TIMEOUT]".yellow().bold(),
                    err.dimmed()
                );
            }
        }
    }
    let _ = io::stdout().flush();
}
