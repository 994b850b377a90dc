//! Host wiring and lifecycle
//!
//! Builds the real service graph from [`Settings`], owns the background
//! tasks, and tears everything down in order on shutdown.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::admin::AdminApi;
use crate::boot::BootSequencer;
use crate::coordinator::{PostUpdateStep, UpdateCoordinator};
use crate::core::LogBuffer;
use crate::error::WardenResult;
use crate::scheduler::AutoUpdateScheduler;
use crate::services::{
    ArchiveUpdater, Diagnostics, FeedInstaller, GitHubRepository, GitLocator, RealCommandRunner, RevisionOracle,
    ServiceSupervisor, VcsUpdater,
};
use crate::settings::Settings;
use crate::traits::{CommandRunner, RemoteRepository, RevisionSource, UpdateStrategy, Updater};
use shared::store::RecordStore;
use shared::{Component, component_debug, component_info, logging};

pub struct Host {
    settings: Settings,
    admin: AdminApi,
    supervisor: Arc<ServiceSupervisor>,
    scheduler: Arc<AutoUpdateScheduler>,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Host {
    pub fn build(settings: Settings) -> WardenResult<Self> {
        let runner: Arc<dyn CommandRunner> = Arc::new(RealCommandRunner::new());
        let remote: Arc<dyn RemoteRepository> = Arc::new(GitHubRepository::new(
            settings.repository.clone(),
            settings.api_base.clone(),
            settings.archive_base.clone(),
        )?);
        let locator = GitLocator::new(settings.git_path.clone());

        let logs = Arc::new(LogBuffer::new(settings.log_capacity));
        let supervisor = Arc::new(ServiceSupervisor::new(settings.worker.clone(), settings.stop_grace, logs));

        let revisions: Arc<dyn RevisionSource> = Arc::new(RevisionOracle::new(
            settings.install_root.clone(),
            settings.primary_branch.clone(),
            locator.clone(),
            Arc::clone(&runner),
            Arc::clone(&remote),
        ));

        let strategies: Vec<Arc<dyn UpdateStrategy>> = vec![
            Arc::new(VcsUpdater::new(
                settings.install_root.clone(),
                locator.clone(),
                Arc::clone(&runner),
                settings.primary_branch.clone(),
                settings.secondary_branch.clone(),
            )),
            Arc::new(
                ArchiveUpdater::new(Arc::clone(&remote), settings.primary_branch.clone(), settings.install_root.clone())
                    .with_work_dir(settings.work_dir.clone())
                    .with_preserved(settings.preserved.clone()),
            ),
        ];
        let steps = PostUpdateStep::python_project(
            &settings.worker.program,
            &settings.install_root,
            &settings.requirements_path(),
            &settings.build_script_path(),
        );
        let updater: Arc<dyn Updater> = Arc::new(UpdateCoordinator::new(strategies, Arc::clone(&runner), steps));

        let auto_update = RecordStore::new(settings.auto_update_path()).owned_by(Component::Scheduler);
        let feeds = Arc::new(FeedInstaller::new(
            settings.feeds_root(),
            RecordStore::new(settings.feed_info_path()).owned_by(Component::Feeds),
        ));
        let diagnostics = Arc::new(Diagnostics::new(settings.install_root.clone(), locator, runner));

        let scheduler = Arc::new(AutoUpdateScheduler::new(
            auto_update.clone(),
            Arc::clone(&revisions),
            Arc::clone(&updater),
            settings.check_interval,
        ));
        let admin = AdminApi::new(
            Arc::clone(&supervisor),
            revisions,
            updater,
            auto_update,
            feeds,
            diagnostics,
        );

        Ok(Self {
            settings,
            admin,
            supervisor,
            scheduler,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    pub fn admin(&self) -> &AdminApi {
        &self.admin
    }

    /// Spawn the auto-update loop and, when allowed, the boot auto-start
    pub fn spawn_background(&mut self) {
        let scheduler = Arc::clone(&self.scheduler);
        let cancel = self.cancel.clone();
        self.tasks.push(("scheduler", tokio::spawn(scheduler.run(cancel))));

        if self.settings.dev_mode || !self.settings.auto_start {
            component_info!(Component::Boot, "Worker auto-start disabled");
            return;
        }
        if !BootSequencer::claim() {
            component_debug!(Component::Boot, "Boot sequence already claimed in this process");
            return;
        }

        let boot = BootSequencer::new(Arc::clone(&self.supervisor), self.settings.boot_grace);
        let cancel = self.cancel.clone();
        self.tasks.push((
            "boot",
            tokio::spawn(async move {
                let outcome = boot.run(cancel).await;
                component_debug!(Component::Boot, "Boot sequence finished: {:?}", outcome);
            }),
        ));
    }

    /// Cancel background work, stop the worker and join every task
    pub async fn shutdown(self) {
        logging::log_shutdown(Component::Host, "stopping background tasks");
        self.cancel.cancel();

        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                logging::log_error(Component::Host, name, &e);
            }
        }

        self.supervisor.shutdown().await;
        logging::log_success(Component::Host, "Warden stopped");
    }
}
