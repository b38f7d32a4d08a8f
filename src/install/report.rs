//! Installation result types.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Installers whose logs are watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Installer {
    BuildTools,
    Python,
}

impl Installer {
    /// Human-readable product name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::BuildTools => "Visual Studio Build Tools",
            Self::Python => "Python 2.7",
        }
    }
}

impl fmt::Display for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How a single installer ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallerStatus {
    Installed {
        path: Option<PathBuf>,
    },
    /// The installer gave up; its logs are in `log_dir`.
    Failed {
        log_dir: PathBuf,
        detail: Option<String>,
    },
    TimedOut {
        waited_ms: u64,
    },
}

impl InstallerStatus {
    #[must_use]
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Outcome of watching both installers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub build_tools: InstallerStatus,
    pub python: InstallerStatus,
}

impl InstallReport {
    #[must_use]
    pub fn all_installed(&self) -> bool {
        self.build_tools.is_installed() && self.python.is_installed()
    }

    /// Where Python ended up, if it was installed.
    #[must_use]
    pub fn python_path(&self) -> Option<&Path> {
        match &self.python {
            InstallerStatus::Installed { path } => path.as_deref(),
            _ => None,
        }
    }
}
