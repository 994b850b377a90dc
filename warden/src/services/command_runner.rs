//! Real external command runner built on `tokio::process`

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{WardenError, WardenResult};
use crate::traits::{CommandOutput, CommandRunner, CommandSpec};
use shared::{Component, component_debug};

/// Runs commands as child processes with captured output
#[derive(Debug, Clone, Copy, Default)]
pub struct RealCommandRunner;

impl RealCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for RealCommandRunner {
    async fn run(&self, spec: CommandSpec) -> WardenResult<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the child on timeout kills it
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        component_debug!(Component::Updater, "Running {}", spec.display());

        let child = cmd.spawn().map_err(|source| WardenError::CommandSpawn {
            program: spec.program_name(),
            source,
        })?;

        match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(CommandOutput {
                status_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(source)) => Err(WardenError::CommandSpawn {
                program: spec.program_name(),
                source,
            }),
            Err(_) => Err(WardenError::CommandTimeout {
                program: spec.program_name(),
                timeout: spec.timeout,
            }),
        }
    }
}
