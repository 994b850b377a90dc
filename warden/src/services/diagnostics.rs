//! Working-copy diagnostics for the `doctor` command

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::services::git_locator::GitLocator;
use crate::traits::{CommandRunner, CommandSpec};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticsReport {
    pub git_executable: String,
    pub install_root: String,
    pub is_git_repo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uncommitted_changes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

pub struct Diagnostics {
    install_root: PathBuf,
    locator: GitLocator,
    runner: Arc<dyn CommandRunner>,
}

impl Diagnostics {
    pub fn new(install_root: impl Into<PathBuf>, locator: GitLocator, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            install_root: install_root.into(),
            locator,
            runner,
        }
    }

    /// Collect the report. Query failures are reported inline.
    pub async fn report(&self) -> DiagnosticsReport {
        let git = self.locator.locate();
        let is_git_repo = self.install_root.join(".git").exists();

        let mut report = DiagnosticsReport {
            git_executable: git
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "NOT FOUND".to_string()),
            install_root: self.install_root.display().to_string(),
            is_git_repo,
            current_branch: None,
            current_commit: None,
            uncommitted_changes: None,
            remote_url: None,
        };

        if let (Some(git), true) = (git, is_git_repo) {
            report.current_branch = Some(self.query(&git, &["branch", "--show-current"]).await);
            report.current_commit = Some(self.query(&git, &["rev-parse", "HEAD"]).await);
            report.uncommitted_changes = Some(self.query(&git, &["status", "--porcelain"]).await);
            report.remote_url = Some(self.query(&git, &["config", "--get", "remote.origin.url"]).await);
        }
        report
    }

    async fn query(&self, git: &Path, args: &[&str]) -> String {
        let spec = CommandSpec::new(git, QUERY_TIMEOUT)
            .arg("-C")
            .arg(self.install_root.to_string_lossy())
            .args(args.iter().copied());

        match self.runner.run(spec).await {
            Ok(output) if output.success() => output.stdout.trim().to_string(),
            Ok(output) => format!("ERROR: {}", output.diagnostic()),
            Err(e) => format!("ERROR: {e}"),
        }
    }
}
