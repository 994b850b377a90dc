//! Trait definitions with mockall annotations for testing
//!
//! Every external effect the core depends on (subprocesses, the hosted
//! repository, revision lookups, update strategies) sits behind one of these
//! traits so the coordination logic can be exercised with fakes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use shared::Revision;

use crate::error::WardenResult;

/// An external command invocation with a hard timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program name for log and error messages
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Human-readable command line
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }

    /// Most useful diagnostic text: stderr when present, stdout otherwise
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Summary of a completed update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Name of the strategy that replaced the source files
    pub method: String,
    pub completed_at: DateTime<Local>,
}

/// Runs external tools (git, the package manager, build scripts)
#[mockall::automock]
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, capturing its output
    ///
    /// # Returns
    /// The captured output for any exit status. Errors are reserved for a
    /// command that could not be launched or exceeded its timeout.
    async fn run(&self, spec: CommandSpec) -> WardenResult<CommandOutput>;
}

/// Hosted repository the installation tracks
#[mockall::automock]
#[async_trait::async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Tip revision of a branch
    async fn latest_revision(&self, branch: &str) -> WardenResult<Revision>;

    /// Full-source snapshot of a branch as a zip archive
    async fn download_snapshot(&self, branch: &str) -> WardenResult<Vec<u8>>;
}

/// Local and remote revision lookup
#[mockall::automock]
#[async_trait::async_trait]
pub trait RevisionSource: Send + Sync {
    /// Revision of the installed source, `None` when it cannot be determined
    async fn local_revision(&self) -> Option<Revision>;

    /// Tip of the tracked remote branch
    async fn remote_revision(&self) -> WardenResult<Revision>;

    /// Whether a version-control client is installed on this host
    fn has_vcs_client(&self) -> bool;
}

/// One way of replacing the installed source with the remote version
#[mockall::automock]
#[async_trait::async_trait]
pub trait UpdateStrategy: Send + Sync {
    /// Short name reported to clients, e.g. `git` or `archive`
    fn name(&self) -> &'static str;

    /// Capability probe run before `apply`
    async fn is_viable(&self) -> bool;

    /// Replace the installed source
    async fn apply(&self) -> WardenResult<()>;
}

/// Full update: source replacement followed by the rebuild steps
#[mockall::automock]
#[async_trait::async_trait]
pub trait Updater: Send + Sync {
    async fn perform_update(&self) -> WardenResult<UpdateReport>;
}
