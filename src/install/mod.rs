//! Installation orchestration.
//!
//! Watches the Visual Studio Build Tools and Python installer logs at the
//! same time and combines their outcomes into one report.

mod error;
mod orchestrator;
mod report;

pub use error::InstallError;
pub use orchestrator::Orchestrator;
pub use report::{InstallReport, Installer, InstallerStatus};
