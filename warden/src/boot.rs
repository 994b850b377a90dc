//! Delayed worker auto-start at host boot

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::services::process_supervisor::{ServiceSupervisor, StartOutcome};
use shared::{Component, component_error, component_info};

static BOOT_CLAIMED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    Started,
    AlreadyRunning,
    Failed(String),
    Cancelled,
}

pub struct BootSequencer {
    supervisor: Arc<ServiceSupervisor>,
    grace: Duration,
}

impl BootSequencer {
    pub fn new(supervisor: Arc<ServiceSupervisor>, grace: Duration) -> Self {
        Self { supervisor, grace }
    }

    /// Claim the one boot sequence allowed per process
    pub fn claim() -> bool {
        BOOT_CLAIMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Wait out the grace period, then start the worker unless it already runs
    pub async fn run(&self, cancel: CancellationToken) -> BootOutcome {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return BootOutcome::Cancelled,
            _ = tokio::time::sleep(self.grace) => {}
        }

        if self.supervisor.status() {
            component_info!(Component::Boot, "Worker already running, nothing to do");
            return BootOutcome::AlreadyRunning;
        }

        match self.supervisor.start().await {
            Ok(StartOutcome::Started { .. }) => {
                component_info!(Component::Boot, "🚀 Worker auto-started");
                BootOutcome::Started
            }
            Ok(StartOutcome::AlreadyRunning) => BootOutcome::AlreadyRunning,
            Err(e) => {
                component_error!(Component::Boot, "Auto-start failed: {}", e);
                BootOutcome::Failed(e.to_string())
            }
        }
    }
}
