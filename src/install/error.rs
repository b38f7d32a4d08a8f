//! Installation error types.

use super::Installer;

/// Errors that abort an installation run.
#[derive(thiserror::Error, Debug)]
pub enum InstallError {
    /// An installer log reported an internal error.
    #[error("{installer} installer reported an error: {}", detail.as_deref().unwrap_or("no details"))]
    InstallerReported {
        installer: Installer,
        detail: Option<String>,
    },

    /// A monitor ended without an outcome (cancelled or panicked).
    #[error("{installer} monitor stopped before the installer finished")]
    MonitorStopped { installer: Installer },
}

impl InstallError {
    #[must_use]
    pub fn installer(&self) -> Installer {
        match self {
            Self::InstallerReported { installer, .. } | Self::MonitorStopped { installer } => {
                *installer
            }
        }
    }
}
