//! Admin facade
//!
//! Maps core operations to the response payloads a request layer serves.
//! Every method returns a structured result; failures are carried inside
//! the payload rather than surfacing as errors.

use std::path::Path;
use std::sync::Arc;

use shared::store::RecordStore;
use shared::{
    ApplyUpdateResponse, AutoUpdateConfig, CheckUpdateResponse, Component, FeedUpdateInfo, StartResponse,
    StartStatus, StatusResponse, StopResponse, StopStatus, component_error, component_info, component_warn,
};

use crate::error::WardenResult;
use crate::services::diagnostics::{Diagnostics, DiagnosticsReport};
use crate::services::feed_installer::{ArchiveOwnership, FeedInstaller};
use crate::services::process_supervisor::{ServiceSupervisor, StartOutcome, StopOutcome};
use crate::traits::{RevisionSource, Updater};

#[derive(Clone)]
pub struct AdminApi {
    supervisor: Arc<ServiceSupervisor>,
    revisions: Arc<dyn RevisionSource>,
    updater: Arc<dyn Updater>,
    auto_update: RecordStore<AutoUpdateConfig>,
    feeds: Arc<FeedInstaller>,
    diagnostics: Arc<Diagnostics>,
}

impl AdminApi {
    pub fn new(
        supervisor: Arc<ServiceSupervisor>,
        revisions: Arc<dyn RevisionSource>,
        updater: Arc<dyn Updater>,
        auto_update: RecordStore<AutoUpdateConfig>,
        feeds: Arc<FeedInstaller>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            supervisor,
            revisions,
            updater,
            auto_update,
            feeds,
            diagnostics,
        }
    }

    pub async fn start(&self) -> StartResponse {
        match self.supervisor.start().await {
            Ok(StartOutcome::Started { .. }) => StartResponse::status(StartStatus::Started),
            Ok(StartOutcome::AlreadyRunning) => StartResponse::status(StartStatus::AlreadyRunning),
            Err(e) => {
                component_error!(Component::Supervisor, "Start failed: {}", e);
                StartResponse::error(e.to_string())
            }
        }
    }

    pub async fn stop(&self) -> StopResponse {
        match self.supervisor.stop().await {
            Ok(StopOutcome::Stopped { .. }) => StopResponse::status(StopStatus::Stopped),
            Ok(StopOutcome::NotRunning) => StopResponse::status(StopStatus::NotRunning),
            Err(e) => {
                component_error!(Component::Supervisor, "Stop failed: {}", e);
                StopResponse::error(e.to_string())
            }
        }
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            running: self.supervisor.status(),
        }
    }

    pub fn logs(&self) -> String {
        self.supervisor.logs().render()
    }

    pub async fn check_update(&self) -> CheckUpdateResponse {
        let remote = match self.revisions.remote_revision().await {
            Ok(remote) => remote,
            Err(e) => return CheckUpdateResponse::remote_failed(&e),
        };

        match self.revisions.local_revision().await {
            Some(local) => CheckUpdateResponse::compared(&local, &remote, self.revisions.has_vcs_client()),
            None => CheckUpdateResponse::local_unknown(),
        }
    }

    /// Run a full update; blocks until it finishes or fails
    pub async fn apply_update(&self) -> ApplyUpdateResponse {
        match self.updater.perform_update().await {
            Ok(report) => {
                component_info!(Component::Updater, "Update applied via {}", report.method);
                ApplyUpdateResponse::success(format!(
                    "Application updated via {} at {}",
                    report.method,
                    report.completed_at.format("%Y-%m-%d %H:%M:%S")
                ))
            }
            Err(e) => {
                if e.is_rebuild_issue() {
                    component_warn!(Component::Updater, "Source replaced but rebuild incomplete: {}", e);
                } else {
                    component_error!(Component::Updater, "Update failed: {}", e);
                }
                ApplyUpdateResponse::failure(format!("Update failed: {e}"))
            }
        }
    }

    pub fn auto_update_config(&self) -> AutoUpdateConfig {
        self.auto_update.load()
    }

    /// Validate and persist the auto-update settings
    pub fn save_auto_update(&self, enabled: bool, time: &str) -> WardenResult<AutoUpdateConfig> {
        let config = AutoUpdateConfig::new(enabled, time)?;
        self.auto_update.save(&config)?;
        component_info!(
            Component::Scheduler,
            "Auto-update {} at {}",
            if enabled { "enabled" } else { "disabled" },
            config.time
        );
        Ok(config)
    }

    pub fn gtfs_update_info(&self) -> FeedUpdateInfo {
        self.feeds.info()
    }

    pub async fn install_feed(&self, feed: &str, archive: &Path, ownership: ArchiveOwnership) -> WardenResult<String> {
        self.feeds.install(feed, archive, ownership).await
    }

    pub async fn diagnostics(&self) -> DiagnosticsReport {
        self.diagnostics.report().await
    }
}
