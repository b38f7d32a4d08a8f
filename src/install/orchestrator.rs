//! Watches the build tools and Python installers side by side.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::config::InstallConfig;
use crate::display;
use crate::watcher::{Classifier, MonitorEvent, MonitorHandle, TailMonitor, WatchTarget};

use super::{InstallError, InstallReport, Installer, InstallerStatus};

/// Drives one monitor per installer and combines their outcomes.
///
/// The installers themselves are launched elsewhere; this only reads
/// their logs.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: InstallConfig,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: InstallConfig) -> Self {
        Self { config }
    }

    fn watch(&self, installer: Installer, cancel: &CancellationToken) -> MonitorHandle {
        let (target, classifier) = match installer {
            Installer::BuildTools => (self.config.build_tools_target(), Classifier::build_tools()),
            Installer::Python => (self.config.python_target(), Classifier::python()),
        };
        tracing::debug!(
            installer = %installer,
            path = %target.path().display(),
            encoding = %target.encoding(),
            "Watching installer log"
        );
        TailMonitor::new(target, classifier, self.config.monitor.to_options())
            .spawn_with(cancel.child_token())
    }

    /// Wait for both installers to finish.
    ///
    /// Failures and timeouts are recorded in the report. An installer error
    /// aborts the run and stops the other monitor.
    ///
    /// # Errors
    ///
    /// Returns `InstallError::InstallerReported` if a log reports an
    /// internal installer error, or `InstallError::MonitorStopped` if
    /// `cancel` fires first.
    pub async fn run(&self, cancel: CancellationToken) -> Result<InstallReport, InstallError> {
        let run_token = cancel.child_token();
        display::print_waiting(
            &self.config.build_tools_log(),
            &self.config.python_log(),
        );

        let build_tools = self.watch(Installer::BuildTools, &run_token);
        let python = self.watch(Installer::Python, &run_token);

        let (build_tools, python) = tokio::join!(
            self.settle(Installer::BuildTools, build_tools, &run_token),
            self.settle(Installer::Python, python, &run_token),
        );

        match (build_tools, python) {
            (Ok(build_tools), Ok(python)) => Ok(InstallReport {
                build_tools,
                python,
            }),
            (Err(e @ InstallError::InstallerReported { .. }), _)
            | (_, Err(e @ InstallError::InstallerReported { .. }))
            | (Err(e), _)
            | (_, Err(e)) => Err(e),
        }
    }

    async fn settle(
        &self,
        installer: Installer,
        handle: MonitorHandle,
        run_token: &CancellationToken,
    ) -> Result<InstallerStatus, InstallError> {
        let Some(event) = handle.wait().await else {
            tracing::debug!(installer = %installer, "Monitor stopped without an outcome");
            return Err(InstallError::MonitorStopped { installer });
        };

        match event {
            MonitorEvent::Success { detail } => {
                let path = self.installed_path(installer, detail);
                display::print_installer_success(installer.display_name(), path.as_deref());
                tracing::debug!(installer = %installer, path = ?path, "Installer succeeded");
                Ok(InstallerStatus::Installed { path })
            }
            MonitorEvent::Failure { detail } => {
                let log_dir = self.config.log_dir_for(self.target(installer).path());
                display::print_installer_failure(installer.display_name(), &log_dir);
                tracing::debug!(installer = %installer, detail = ?detail, "Installer failed");
                Ok(InstallerStatus::Failed { log_dir, detail })
            }
            MonitorEvent::Timeout { waited_ms, last_error } => {
                display::print_installer_timeout(installer.display_name(), waited_ms);
                tracing::warn!(
                    installer = %installer,
                    waited_ms,
                    last_error = ?last_error,
                    "Installer log never reported an outcome"
                );
                Ok(InstallerStatus::TimedOut { waited_ms })
            }
            MonitorEvent::Error { detail } => {
                display::print_installer_error(installer.display_name(), detail.as_deref());
                run_token.cancel();
                Err(InstallError::InstallerReported { installer, detail })
            }
        }
    }

    fn target(&self, installer: Installer) -> WatchTarget {
        match installer {
            Installer::BuildTools => self.config.build_tools_target(),
            Installer::Python => self.config.python_target(),
        }
    }

    fn installed_path(&self, installer: Installer, detail: Option<String>) -> Option<PathBuf> {
        let reported = detail.map(PathBuf::from);
        match installer {
            Installer::BuildTools => reported,
            Installer::Python => reported.or_else(|| Some(self.config.python_install_dir())),
        }
    }
}
