//! Service implementations
//!
//! This module contains the real implementations of the trait seams plus
//! the services that sit directly on top of them. These handle actual I/O:
//! subprocesses, HTTP, archives and the installation tree.

pub mod archive;
pub mod archive_updater;
pub mod command_runner;
pub mod diagnostics;
pub mod feed_installer;
pub mod git_locator;
pub mod github;
pub mod process_supervisor;
pub mod revision_oracle;
pub mod vcs_updater;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use archive::PreservedPaths;
pub use archive_updater::{ArchiveReport, ArchiveUpdater, BackupPolicy};
pub use command_runner::RealCommandRunner;
pub use diagnostics::{Diagnostics, DiagnosticsReport};
pub use feed_installer::{ArchiveOwnership, FeedInstaller};
pub use git_locator::GitLocator;
pub use github::GitHubRepository;
pub use process_supervisor::{ServiceSupervisor, StartOutcome, StopOutcome, WorkerCommand};
pub use revision_oracle::RevisionOracle;
pub use vcs_updater::VcsUpdater;
