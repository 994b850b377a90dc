//! Hourly auto-update loop
//!
//! Each tick reloads the auto-update record, and once the configured time of
//! day has passed compares the local and remote revisions. An update is
//! triggered at most once per calendar day. Nothing that happens inside a
//! tick ends the loop; only cancellation does.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio_util::sync::CancellationToken;

use crate::core::{DailyTrigger, TriggerDecision};
use crate::traits::{RevisionSource, Updater};
use shared::store::RecordStore;
use shared::{AutoUpdateConfig, Component, component_debug, component_error, component_info, component_warn};

/// What one tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Disabled,
    InvalidTime(String),
    BeforeCutoff,
    AlreadyUpdatedToday,
    LocalUnknown,
    RemoteUnavailable(String),
    UpToDate,
    Updated { method: String },
    UpdateFailed(String),
}

pub struct AutoUpdateScheduler {
    config: RecordStore<AutoUpdateConfig>,
    revisions: Arc<dyn RevisionSource>,
    updater: Arc<dyn Updater>,
    interval: Duration,
    trigger: Mutex<DailyTrigger>,
}

impl AutoUpdateScheduler {
    pub fn new(
        config: RecordStore<AutoUpdateConfig>,
        revisions: Arc<dyn RevisionSource>,
        updater: Arc<dyn Updater>,
        interval: Duration,
    ) -> Self {
        Self {
            config,
            revisions,
            updater,
            interval,
            trigger: Mutex::new(DailyTrigger::new()),
        }
    }

    /// Loop until `cancel` fires
    ///
    /// Each tick runs as its own task so even a panic inside it is contained.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        component_info!(Component::Scheduler, "⏰ Auto-update loop started (every {:?})", self.interval);

        loop {
            let this = Arc::clone(&self);
            let tick = tokio::spawn(async move { this.tick_at(Local::now().naive_local()).await });

            match tick.await {
                Ok(outcome) => component_debug!(Component::Scheduler, "Tick finished: {:?}", outcome),
                Err(e) => component_error!(Component::Scheduler, "Tick aborted: {}", e),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        component_info!(Component::Scheduler, "Auto-update loop stopped");
    }

    /// Evaluate the schedule as of `now` and update if due
    pub async fn tick_at(&self, now: NaiveDateTime) -> TickOutcome {
        let config = self.config.load();
        if !config.enabled {
            return TickOutcome::Disabled;
        }
        let cutoff = match config.cutoff() {
            Ok(cutoff) => cutoff,
            Err(e) => {
                component_warn!(Component::Scheduler, "Ignoring auto-update config: {}", e);
                return TickOutcome::InvalidTime(config.time);
            }
        };

        match self.decide(now, cutoff) {
            TriggerDecision::BeforeCutoff => return TickOutcome::BeforeCutoff,
            TriggerDecision::AlreadyTriggered(_) => return TickOutcome::AlreadyUpdatedToday,
            TriggerDecision::Due => {}
        }

        let Some(local) = self.revisions.local_revision().await else {
            component_warn!(Component::Scheduler, "Local revision unknown, skipping auto-update");
            return TickOutcome::LocalUnknown;
        };
        let remote = match self.revisions.remote_revision().await {
            Ok(remote) => remote,
            Err(e) => {
                component_warn!(Component::Scheduler, "Remote revision unavailable: {}", e);
                return TickOutcome::RemoteUnavailable(e.to_string());
            }
        };

        if local == remote {
            component_debug!(Component::Scheduler, "Up to date at {}", local.short());
            return TickOutcome::UpToDate;
        }

        component_info!(
            Component::Scheduler,
            "🔄 Auto-updating {} -> {}",
            local.short(),
            remote.short()
        );
        self.mark(now);

        match self.updater.perform_update().await {
            Ok(report) => TickOutcome::Updated { method: report.method },
            Err(e) => {
                component_error!(Component::Scheduler, "Auto-update failed: {}", e);
                TickOutcome::UpdateFailed(e.to_string())
            }
        }
    }

    fn decide(&self, now: NaiveDateTime, cutoff: chrono::NaiveTime) -> TriggerDecision {
        let trigger = self.trigger.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        trigger.evaluate(now, cutoff)
    }

    fn mark(&self, now: NaiveDateTime) {
        let mut trigger = self.trigger.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        trigger.mark(now.date());
    }
}
