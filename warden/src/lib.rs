//! Warden: a self-supervising service manager
//!
//! This library supervises one long-running worker process, buffers its
//! output, and keeps the installation current by comparing the local source
//! revision with the remote branch tip and applying in-place updates through
//! either version control or a downloaded source archive.

pub mod admin;
pub mod boot;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod host;
pub mod scheduler;
pub mod services;
pub mod settings;
pub mod traits;

// Re-export commonly used types
pub use admin::AdminApi;
pub use boot::{BootOutcome, BootSequencer};
pub use coordinator::{PostUpdateStep, StepKind, UpdateCoordinator};
pub use core::{DailyTrigger, LogBuffer, LogEntry, TriggerDecision};
pub use error::{VcsStep, WardenError, WardenResult};
pub use host::Host;
pub use scheduler::{AutoUpdateScheduler, TickOutcome};
pub use settings::{Settings, SettingsArgs};
pub use traits::{CommandOutput, CommandRunner, CommandSpec, RemoteRepository, RevisionSource, UpdateReport, UpdateStrategy, Updater};
