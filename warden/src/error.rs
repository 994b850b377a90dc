//! Warden-specific error types

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use shared::SharedError;
use thiserror::Error;

/// Step of the version-control update sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsStep {
    Status,
    Reset,
    Fetch,
    Pull,
}

impl fmt::Display for VcsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsStep::Status => write!(f, "status"),
            VcsStep::Reset => write!(f, "reset"),
            VcsStep::Fetch => write!(f, "fetch"),
            VcsStep::Pull => write!(f, "pull"),
        }
    }
}

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Failed to spawn worker {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker did not exit within {grace:?} and was killed")]
    ProcessTimeout { grace: Duration },

    #[error("Remote query failed: {message}")]
    RemoteQuery { message: String },

    #[error("Version control unavailable: {reason}")]
    VcsUnavailable { reason: String },

    #[error("git {step} failed: {output}")]
    VcsStep { step: VcsStep, output: String },

    #[error("Unsafe path in archive: {entry}")]
    UnsafeArchiveEntry { entry: String },

    #[error("Unexpected archive layout: {reason}")]
    ArchiveLayout { reason: String },

    #[error("Frontend rebuild timed out after {timeout:?}")]
    RebuildTimeout { timeout: Duration },

    #[error("Frontend rebuild failed: {reason}")]
    RebuildFailure { reason: String },

    #[error("Dependency install failed: {reason}")]
    DependencyInstall { reason: String },

    #[error("Source updated via {method} but the rebuild had issues: {}", render_issues(.issues))]
    RebuildIncomplete { method: String, issues: Vec<WardenError> },

    #[error("{program} timed out after {timeout:?}")]
    CommandTimeout { program: String, timeout: Duration },

    #[error("Failed to run {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No update strategy could be attempted")]
    NoStrategy,

    #[error("Invalid feed name: {name}")]
    InvalidFeed { name: String },

    #[error("File system operation failed: {operation} on {path}")]
    FileSystemError {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),
}

fn render_issues(issues: &[WardenError]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl WardenError {
    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteQuery {
            message: message.into(),
        }
    }

    pub fn fs(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystemError {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Whether the failure happened after source files were already replaced
    pub fn is_rebuild_issue(&self) -> bool {
        matches!(self, Self::RebuildIncomplete { .. })
    }
}

pub type WardenResult<T> = Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_incomplete_lists_every_issue() {
        let err = WardenError::RebuildIncomplete {
            method: "git".to_string(),
            issues: vec![
                WardenError::DependencyInstall {
                    reason: "exit code 1".to_string(),
                },
                WardenError::RebuildTimeout {
                    timeout: Duration::from_secs(900),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("via git"));
        assert!(message.contains("Dependency install failed: exit code 1"));
        assert!(message.contains("rebuild timed out"));
        assert!(err.is_rebuild_issue());
    }

    #[test]
    fn test_vcs_step_error_names_step() {
        let err = WardenError::VcsStep {
            step: VcsStep::Fetch,
            output: "could not resolve host".to_string(),
        };
        assert_eq!(err.to_string(), "git fetch failed: could not resolve host");
    }
}
