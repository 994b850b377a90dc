//! Source replacement through the git working copy

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{VcsStep, WardenError, WardenResult};
use crate::services::git_locator::GitLocator;
use crate::traits::{CommandOutput, CommandRunner, CommandSpec, UpdateStrategy};
use shared::{Component, component_debug, component_info, component_warn};

/// Per-step timeouts for the git sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcsTimeouts {
    pub status: Duration,
    pub stash: Duration,
    pub reset: Duration,
    pub network: Duration,
}

impl Default for VcsTimeouts {
    fn default() -> Self {
        Self {
            status: Duration::from_secs(30),
            stash: Duration::from_secs(60),
            reset: Duration::from_secs(60),
            network: Duration::from_secs(300),
        }
    }
}

pub struct VcsUpdater {
    install_root: PathBuf,
    locator: GitLocator,
    runner: Arc<dyn CommandRunner>,
    remote_name: String,
    primary_branch: String,
    secondary_branch: String,
    timeouts: VcsTimeouts,
}

impl VcsUpdater {
    pub fn new(
        install_root: impl Into<PathBuf>,
        locator: GitLocator,
        runner: Arc<dyn CommandRunner>,
        primary_branch: impl Into<String>,
        secondary_branch: impl Into<String>,
    ) -> Self {
        Self {
            install_root: install_root.into(),
            locator,
            runner,
            remote_name: "origin".to_string(),
            primary_branch: primary_branch.into(),
            secondary_branch: secondary_branch.into(),
            timeouts: VcsTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: VcsTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn has_metadata(&self) -> bool {
        self.install_root.join(".git").exists()
    }

    fn git(&self, git: &Path, args: &[&str], timeout: Duration) -> CommandSpec {
        CommandSpec::new(git, timeout)
            .arg("-C")
            .arg(self.install_root.to_string_lossy())
            .args(args.iter().copied())
    }

    async fn step(&self, git: &Path, step: VcsStep, args: &[&str], timeout: Duration) -> WardenResult<CommandOutput> {
        match self.runner.run(self.git(git, args, timeout)).await {
            Ok(output) if output.success() => Ok(output),
            Ok(output) => Err(WardenError::VcsStep {
                step,
                output: output.diagnostic(),
            }),
            Err(e) => Err(WardenError::VcsStep {
                step,
                output: e.to_string(),
            }),
        }
    }

    /// Stash local edits; never fails the update
    async fn stash(&self, git: &Path) {
        let message = format!(
            "Auto-stash before update {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let spec = self.git(git, &["stash", "push", "-m", message.as_str()], self.timeouts.stash);
        match self.runner.run(spec).await {
            Ok(output) if output.success() => component_info!(Component::Updater, "Local changes stashed"),
            Ok(output) => component_warn!(Component::Updater, "Could not stash local changes: {}", output.diagnostic()),
            Err(e) => component_warn!(Component::Updater, "Could not stash local changes: {}", e),
        }
    }

    /// Run the status, stash, reset, fetch, pull sequence
    ///
    /// # Returns
    /// The branch that was pulled.
    pub async fn update(&self) -> WardenResult<String> {
        let git = self.locator.locate().ok_or_else(|| WardenError::VcsUnavailable {
            reason: "git executable not found".to_string(),
        })?;
        if !self.has_metadata() {
            return Err(WardenError::VcsUnavailable {
                reason: format!("{} is not a git working copy", self.install_root.display()),
            });
        }

        let status = self
            .step(&git, VcsStep::Status, &["status", "--porcelain"], self.timeouts.status)
            .await?;
        if !status.stdout.trim().is_empty() {
            component_warn!(Component::Updater, "Local modifications detected, stashing");
            self.stash(&git).await;
        }

        self.step(&git, VcsStep::Reset, &["reset", "--hard", "HEAD"], self.timeouts.reset)
            .await?;
        self.step(&git, VcsStep::Fetch, &["fetch", self.remote_name.as_str()], self.timeouts.network)
            .await?;

        let primary = ["pull", self.remote_name.as_str(), self.primary_branch.as_str()];
        match self.step(&git, VcsStep::Pull, &primary, self.timeouts.network).await {
            Ok(_) => Ok(self.primary_branch.clone()),
            Err(e) => {
                component_debug!(
                    Component::Updater,
                    "Pulling {} failed ({}), trying {}",
                    self.primary_branch,
                    e,
                    self.secondary_branch
                );
                let secondary = ["pull", self.remote_name.as_str(), self.secondary_branch.as_str()];
                self.step(&git, VcsStep::Pull, &secondary, self.timeouts.network).await?;
                Ok(self.secondary_branch.clone())
            }
        }
    }
}

#[async_trait]
impl UpdateStrategy for VcsUpdater {
    fn name(&self) -> &'static str {
        "git"
    }

    async fn is_viable(&self) -> bool {
        self.has_metadata() && self.locator.locate().is_some()
    }

    async fn apply(&self) -> WardenResult<()> {
        let branch = self.update().await?;
        component_info!(Component::Updater, "✅ Pulled {} via git", branch);
        Ok(())
    }
}
