//! Update coordination
//!
//! Tries each source-replacement strategy in order until one succeeds, then
//! runs the post-update steps. Every post-update step is attempted even when
//! an earlier one failed; dependency and build failures are collected and
//! reported together once the source is already in place.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;

use crate::error::{WardenError, WardenResult};
use crate::traits::{CommandOutput, CommandRunner, CommandSpec, UpdateReport, UpdateStrategy, Updater};
use shared::{Component, component_debug, component_info, component_warn};

/// How a post-update step failure is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Package tool self-upgrade; failures are only logged
    ToolUpgrade,
    /// Dependency reinstall
    Dependencies,
    /// Presentation-layer build script, distinguishes timeouts
    Build,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUpdateStep {
    pub label: &'static str,
    pub kind: StepKind,
    pub command: CommandSpec,
    /// Step is skipped when this file does not exist
    pub requires: Option<PathBuf>,
}

impl PostUpdateStep {
    /// The standard steps for a Python worker with a frontend install script
    pub fn python_project(runtime: &Path, install_root: &Path, requirements: &Path, build_script: &Path) -> Vec<Self> {
        let requirements_arg = requirements.to_string_lossy().into_owned();
        let build_command = if is_batch_file(build_script) {
            CommandSpec::new("cmd", Duration::from_secs(900))
                .arg("/C")
                .arg(build_script.to_string_lossy())
        } else {
            CommandSpec::new("sh", Duration::from_secs(900)).arg(build_script.to_string_lossy())
        };

        vec![
            Self {
                label: "package tool upgrade",
                kind: StepKind::ToolUpgrade,
                command: CommandSpec::new(runtime, Duration::from_secs(300))
                    .args(["-m", "pip", "install", "--upgrade", "pip"])
                    .current_dir(install_root),
                requires: None,
            },
            Self {
                label: "dependency install",
                kind: StepKind::Dependencies,
                command: CommandSpec::new(runtime, Duration::from_secs(600))
                    .args(["-m", "pip", "install", "-r"])
                    .arg(requirements_arg)
                    .current_dir(install_root),
                requires: Some(requirements.to_path_buf()),
            },
            Self {
                label: "frontend rebuild",
                kind: StepKind::Build,
                command: build_command.arg("silent").current_dir(install_root),
                requires: Some(build_script.to_path_buf()),
            },
        ]
    }
}

fn is_batch_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bat") || ext.eq_ignore_ascii_case("cmd"))
}

pub struct UpdateCoordinator {
    strategies: Vec<Arc<dyn UpdateStrategy>>,
    runner: Arc<dyn CommandRunner>,
    steps: Vec<PostUpdateStep>,
}

impl UpdateCoordinator {
    pub fn new(strategies: Vec<Arc<dyn UpdateStrategy>>, runner: Arc<dyn CommandRunner>, steps: Vec<PostUpdateStep>) -> Self {
        Self {
            strategies,
            runner,
            steps,
        }
    }

    /// Replace the source with the first viable strategy that succeeds
    ///
    /// # Returns
    /// The name of the strategy that succeeded. When every attempted
    /// strategy fails, the error of the last one.
    pub async fn replace_source(&self) -> WardenResult<&'static str> {
        let mut last_error = None;

        for strategy in &self.strategies {
            if !strategy.is_viable().await {
                component_debug!(Component::Updater, "Skipping {} update, not viable", strategy.name());
                continue;
            }

            component_info!(Component::Updater, "🔄 Updating via {}", strategy.name());
            match strategy.apply().await {
                Ok(()) => return Ok(strategy.name()),
                Err(e) => {
                    component_warn!(Component::Updater, "{} update failed: {}", strategy.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(WardenError::NoStrategy))
    }

    /// Run every post-update step, returning the failures that matter
    pub async fn rebuild(&self) -> Vec<WardenError> {
        let mut issues = Vec::new();

        for step in &self.steps {
            if let Some(required) = &step.requires {
                if !required.exists() {
                    component_warn!(
                        Component::Updater,
                        "Skipping {}: {} not found",
                        step.label,
                        required.display()
                    );
                    continue;
                }
            }

            component_info!(Component::Updater, "🔧 Running {}", step.label);
            let outcome = self.runner.run(step.command.clone()).await;
            if let Some(issue) = classify(step, outcome) {
                component_warn!(Component::Updater, "{}", issue);
                issues.push(issue);
            }
        }

        issues
    }
}

/// Map a step result to the error it contributes, if any
fn classify(step: &PostUpdateStep, outcome: WardenResult<CommandOutput>) -> Option<WardenError> {
    let reason = match outcome {
        Ok(output) if output.success() => return None,
        Ok(output) => {
            let detail = output.diagnostic();
            match output.status_code {
                Some(code) if detail.is_empty() => format!("exit code {code}"),
                Some(code) => format!("exit code {code}: {detail}"),
                None => format!("terminated by signal: {detail}"),
            }
        }
        Err(WardenError::CommandTimeout { timeout, .. }) if step.kind == StepKind::Build => {
            return Some(WardenError::RebuildTimeout { timeout });
        }
        Err(e) => e.to_string(),
    };

    match step.kind {
        StepKind::ToolUpgrade => {
            component_warn!(Component::Updater, "{} failed, continuing: {}", step.label, reason);
            None
        }
        StepKind::Dependencies => Some(WardenError::DependencyInstall { reason }),
        StepKind::Build => Some(WardenError::RebuildFailure { reason }),
    }
}

#[async_trait]
impl Updater for UpdateCoordinator {
    async fn perform_update(&self) -> WardenResult<UpdateReport> {
        let method = self.replace_source().await?;
        let issues = self.rebuild().await;

        if !issues.is_empty() {
            return Err(WardenError::RebuildIncomplete {
                method: method.to_string(),
                issues,
            });
        }

        component_info!(Component::Updater, "✅ Update via {} complete", method);
        Ok(UpdateReport {
            method: method.to_string(),
            completed_at: Local::now(),
        })
    }
}
