//! Runtime settings for the warden host
//!
//! Every value can come from a command-line flag or a `WARDEN_*` environment
//! variable. `main` loads a `.env` file before parsing so deployments can
//! keep these next to the installation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use url::Url;

use crate::error::{WardenError, WardenResult};
use crate::services::archive::PreservedPaths;
use crate::services::process_supervisor::WorkerCommand;

pub const AUTO_UPDATE_RECORD: &str = "auto_update_config.json";
pub const FEED_INFO_RECORD: &str = "gtfs_update_info.json";

/// Command-line and environment form of [`Settings`]
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Installation root (working directory of the worker)
    #[arg(long, env = "WARDEN_INSTALL_ROOT", default_value = ".")]
    pub install_root: PathBuf,

    /// Hosted repository slug, `owner/name`
    #[arg(long, env = "WARDEN_REPOSITORY")]
    pub repository: String,

    /// Base URL of the hosted repository API
    #[arg(long, env = "WARDEN_API_BASE", default_value = "https://api.github.com")]
    pub api_base: String,

    /// Base URL serving branch snapshot archives
    #[arg(long, env = "WARDEN_ARCHIVE_BASE", default_value = "https://github.com")]
    pub archive_base: String,

    /// Branch pulled first
    #[arg(long, env = "WARDEN_PRIMARY_BRANCH", default_value = "main")]
    pub primary_branch: String,

    /// Branch tried when pulling the primary branch fails
    #[arg(long, env = "WARDEN_SECONDARY_BRANCH", default_value = "master")]
    pub secondary_branch: String,

    /// Interpreter used to run the worker and the package manager
    #[arg(long, env = "WARDEN_WORKER_RUNTIME", default_value = "python3")]
    pub worker_runtime: PathBuf,

    /// Whitespace-separated interpreter arguments placed before the entry script
    #[arg(long, env = "WARDEN_WORKER_ARGS", default_value = "-u", allow_hyphen_values = true)]
    pub worker_args: String,

    /// Worker entry script, relative to the installation root
    #[arg(long, env = "WARDEN_WORKER_ENTRY", default_value = "run_main.py")]
    pub worker_entry: String,

    /// Seconds to wait after boot before auto-starting the worker
    #[arg(long, env = "WARDEN_BOOT_GRACE_SECS", default_value_t = 10)]
    pub boot_grace_secs: u64,

    /// Seconds a stopping worker gets before it is killed
    #[arg(long, env = "WARDEN_STOP_GRACE_SECS", default_value_t = 10)]
    pub stop_grace_secs: u64,

    /// Seconds between auto-update checks
    #[arg(long, env = "WARDEN_CHECK_INTERVAL_SECS", default_value_t = 3600)]
    pub check_interval_secs: u64,

    /// Maximum number of buffered worker log lines
    #[arg(long, env = "WARDEN_LOG_CAPACITY", default_value_t = crate::core::DEFAULT_LOG_CAPACITY)]
    pub log_capacity: usize,

    /// Explicit path to the git executable
    #[arg(long, env = "WARDEN_GIT_PATH")]
    pub git_path: Option<PathBuf>,

    /// Start the worker automatically after the boot grace period
    #[arg(long, env = "WARDEN_AUTO_START", default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_start: bool,

    /// Development mode: never auto-start the worker
    #[arg(long, env = "WARDEN_DEV_MODE", default_value_t = false)]
    pub dev_mode: bool,

    /// Directory for temporary download and staging areas
    #[arg(long, env = "WARDEN_WORK_DIR")]
    pub work_dir: Option<PathBuf>,
}

/// Validated settings shared by every component
#[derive(Debug, Clone)]
pub struct Settings {
    pub install_root: PathBuf,
    pub repository: String,
    pub api_base: Url,
    pub archive_base: Url,
    pub primary_branch: String,
    pub secondary_branch: String,
    pub worker: WorkerCommand,
    pub boot_grace: Duration,
    pub stop_grace: Duration,
    pub check_interval: Duration,
    pub log_capacity: usize,
    pub git_path: Option<PathBuf>,
    pub auto_start: bool,
    pub dev_mode: bool,
    pub work_dir: PathBuf,
    pub preserved: PreservedPaths,
}

impl SettingsArgs {
    pub fn into_settings(self) -> WardenResult<Settings> {
        let install_root = std::path::absolute(&self.install_root)
            .map_err(|e| WardenError::fs("resolve install root", &self.install_root, e))?;

        if !is_valid_slug(&self.repository) {
            return Err(WardenError::config(format!(
                "repository must look like owner/name, got '{}'",
                self.repository
            )));
        }
        let api_base = parse_base_url("api_base", &self.api_base)?;
        let archive_base = parse_base_url("archive_base", &self.archive_base)?;

        if self.log_capacity == 0 {
            return Err(WardenError::config("log_capacity must be at least 1"));
        }
        if self.check_interval_secs == 0 {
            return Err(WardenError::config("check_interval_secs must be at least 1"));
        }

        let mut worker_args: Vec<String> = self.worker_args.split_whitespace().map(str::to_string).collect();
        worker_args.push(self.worker_entry);

        Ok(Settings {
            worker: WorkerCommand::new(self.worker_runtime, worker_args, install_root.clone()),
            install_root,
            repository: self.repository,
            api_base,
            archive_base,
            primary_branch: self.primary_branch,
            secondary_branch: self.secondary_branch,
            boot_grace: Duration::from_secs(self.boot_grace_secs),
            stop_grace: Duration::from_secs(self.stop_grace_secs),
            check_interval: Duration::from_secs(self.check_interval_secs),
            log_capacity: self.log_capacity,
            git_path: self.git_path,
            auto_start: self.auto_start,
            dev_mode: self.dev_mode,
            work_dir: self.work_dir.unwrap_or_else(std::env::temp_dir),
            preserved: PreservedPaths::default(),
        })
    }
}

impl Settings {
    pub fn auto_update_path(&self) -> PathBuf {
        self.install_root.join(AUTO_UPDATE_RECORD)
    }

    pub fn feed_info_path(&self) -> PathBuf {
        self.install_root.join(FEED_INFO_RECORD)
    }

    pub fn feeds_root(&self) -> PathBuf {
        self.install_root.join("backend").join("GTFS")
    }

    pub fn requirements_path(&self) -> PathBuf {
        self.install_root.join("requirements.txt")
    }

    /// Platform-specific presentation-layer build script
    pub fn build_script_path(&self) -> PathBuf {
        if cfg!(windows) {
            self.install_root.join("install.bat")
        } else {
            self.install_root.join("install.sh")
        }
    }
}

fn is_valid_slug(slug: &str) -> bool {
    let mut parts = slug.split('/');
    let valid_part = |part: Option<&str>| {
        part.is_some_and(|p| {
            !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
    };
    valid_part(parts.next()) && valid_part(parts.next()) && parts.next().is_none()
}

fn parse_base_url(field: &str, raw: &str) -> WardenResult<Url> {
    let url = Url::parse(raw).map_err(|e| WardenError::config(format!("{field} '{raw}' is not a URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(WardenError::config(format!("{field} must use http or https, got {other}"))),
    }
}
