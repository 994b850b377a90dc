//! Test helpers and builder patterns for warden tests
//!
//! Builders wire the real coordination types to mockall-generated fakes
//! with permissive defaults, so each test only states the behavior it cares
//! about.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use shared::store::RecordStore;
use shared::AutoUpdateConfig;
use tempfile::TempDir;
use warden::coordinator::{PostUpdateStep, StepKind, UpdateCoordinator};
use warden::core::LogBuffer;
use warden::services::{Diagnostics, FeedInstaller, GitLocator, ServiceSupervisor, WorkerCommand};
use warden::traits::{
    CommandOutput, CommandSpec, MockCommandRunner, MockRevisionSource, MockUpdateStrategy, MockUpdater, UpdateReport,
    UpdateStrategy,
};
use warden::{AdminApi, AutoUpdateScheduler, WardenError, WardenResult};

use super::fixtures::TestFixtures;

/// Builder for an [`AdminApi`] backed by mocks and a scratch directory
pub struct AdminBuilder {
    revisions: MockRevisionSource,
    updater: MockUpdater,
    worker: Option<WorkerCommand>,
}

/// Admin facade plus the directory its records live in
pub struct TestAdmin {
    pub admin: AdminApi,
    pub supervisor: Arc<ServiceSupervisor>,
    pub dir: TempDir,
}

impl AdminBuilder {
    pub fn new() -> Self {
        let mut revisions = MockRevisionSource::new();
        revisions.expect_has_vcs_client().return_const(true).times(0..);

        Self {
            revisions,
            updater: MockUpdater::new(),
            worker: None,
        }
    }

    /// Configure the revision source mock with a setup function
    pub fn with_revisions<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockRevisionSource),
    {
        setup(&mut self.revisions);
        self
    }

    /// Configure the updater mock with a setup function
    pub fn with_updater<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockUpdater),
    {
        setup(&mut self.updater);
        self
    }

    pub fn with_worker(mut self, worker: WorkerCommand) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn build(self) -> TestAdmin {
        let dir = tempfile::tempdir().unwrap();
        let worker = self
            .worker
            .unwrap_or_else(|| TestFixtures::shell_worker("sleep 30", dir.path()));
        let supervisor = Arc::new(ServiceSupervisor::new(
            worker,
            Duration::from_secs(2),
            Arc::new(LogBuffer::new(100)),
        ));

        let feeds = Arc::new(FeedInstaller::new(
            dir.path().join("backend/GTFS"),
            RecordStore::new(dir.path().join("gtfs_update_info.json")),
        ));
        let diagnostics = Arc::new(Diagnostics::new(
            dir.path(),
            GitLocator::unavailable(),
            Arc::new(MockCommandRunner::new()),
        ));

        let admin = AdminApi::new(
            Arc::clone(&supervisor),
            Arc::new(self.revisions),
            Arc::new(self.updater),
            RecordStore::new(dir.path().join("auto_update_config.json")),
            feeds,
            diagnostics,
        );

        TestAdmin { admin, supervisor, dir }
    }
}

impl Default for AdminBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for an [`AutoUpdateScheduler`] with a stored config
pub struct SchedulerBuilder {
    config: Option<AutoUpdateConfig>,
    revisions: MockRevisionSource,
    updater: MockUpdater,
    interval: Duration,
}

pub struct TestScheduler {
    pub scheduler: Arc<AutoUpdateScheduler>,
    pub config: RecordStore<AutoUpdateConfig>,
    pub dir: TempDir,
}

impl SchedulerBuilder {
    /// Enabled at the default cutoff, no update expected
    pub fn new() -> Self {
        Self {
            config: Some(AutoUpdateConfig::new(true, TestFixtures::CUTOFF).unwrap()),
            revisions: MockRevisionSource::new(),
            updater: MockUpdater::new(),
            interval: Duration::from_secs(3600),
        }
    }

    /// Stored config; `None` leaves the record absent
    pub fn with_config(mut self, config: Option<AutoUpdateConfig>) -> Self {
        self.config = config;
        self
    }

    /// Local and remote revisions, each looked up any number of times
    pub fn with_revisions(mut self, local: Option<&'static str>, remote: &'static str) -> Self {
        self.revisions
            .expect_local_revision()
            .returning(move || local.and_then(shared::Revision::parse))
            .times(0..);
        self.revisions
            .expect_remote_revision()
            .returning(move || Ok(shared::Revision::parse(remote).unwrap()))
            .times(0..);
        self
    }

    /// Configure the revision source mock with a setup function
    pub fn with_revision_source<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockRevisionSource),
    {
        setup(&mut self.revisions);
        self
    }

    /// Configure the updater mock with a setup function
    pub fn with_updater<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockUpdater),
    {
        setup(&mut self.updater);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn build(self) -> TestScheduler {
        let dir = tempfile::tempdir().unwrap();
        let config = RecordStore::new(dir.path().join("auto_update_config.json"));
        if let Some(record) = &self.config {
            config.save(record).unwrap();
        }

        let scheduler = Arc::new(AutoUpdateScheduler::new(
            config.clone(),
            Arc::new(self.revisions),
            Arc::new(self.updater),
            self.interval,
        ));

        TestScheduler { scheduler, config, dir }
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for an [`UpdateCoordinator`] with scripted strategies and steps
pub struct CoordinatorBuilder {
    strategies: Vec<Arc<dyn UpdateStrategy>>,
    runner: MockCommandRunner,
    steps: Vec<PostUpdateStep>,
}

impl CoordinatorBuilder {
    /// No strategies, no post-update steps
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            runner: MockCommandRunner::new(),
            steps: Vec::new(),
        }
    }

    /// Append a strategy; `apply` is only expected when `viable`
    pub fn with_strategy<F>(mut self, name: &'static str, viable: bool, apply: F) -> Self
    where
        F: Fn() -> WardenResult<()> + Send + 'static,
    {
        self.strategies.push(Arc::new(TestHelpers::strategy(name, viable, apply)));
        self
    }

    /// Append a post-update step running `program`
    pub fn with_step(mut self, label: &'static str, kind: StepKind, program: &str) -> Self {
        self.steps.push(PostUpdateStep {
            label,
            kind,
            command: CommandSpec::new(program, Duration::from_secs(60)),
            requires: None,
        });
        self
    }

    /// Append a step that only runs when `required` exists
    pub fn with_guarded_step(mut self, label: &'static str, kind: StepKind, program: &str, required: &Path) -> Self {
        self.steps.push(PostUpdateStep {
            label,
            kind,
            command: CommandSpec::new(program, Duration::from_secs(60)),
            requires: Some(required.to_path_buf()),
        });
        self
    }

    /// Configure the command runner mock with a setup function
    pub fn with_runner<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockCommandRunner),
    {
        setup(&mut self.runner);
        self
    }

    pub fn build(self) -> UpdateCoordinator {
        UpdateCoordinator::new(self.strategies, Arc::new(self.runner), self.steps)
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    pub fn strategy<F>(name: &'static str, viable: bool, apply: F) -> MockUpdateStrategy
    where
        F: Fn() -> WardenResult<()> + Send + 'static,
    {
        let mut strategy = MockUpdateStrategy::new();
        strategy.expect_name().return_const(name);
        strategy.expect_is_viable().return_const(viable);
        if viable {
            strategy.expect_apply().times(1).returning(move || apply());
        } else {
            strategy.expect_apply().never();
        }
        strategy
    }

    pub fn report(method: &str) -> UpdateReport {
        UpdateReport {
            method: method.to_string(),
            completed_at: Local::now(),
        }
    }

    pub fn output(code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            status_code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    pub fn timeout(program: &str) -> WardenError {
        WardenError::CommandTimeout {
            program: program.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Program name of a command spec as a plain string
    pub fn program(spec: &CommandSpec) -> String {
        spec.program.to_string_lossy().into_owned()
    }

    /// Poll `condition` until it holds or `within` elapses
    pub async fn wait_until<F>(within: Duration, mut condition: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = tokio::time::Instant::now() + within;
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        condition()
    }

    pub fn scratch_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "").unwrap();
        path
    }
}
