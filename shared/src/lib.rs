//! Shared types for the warden service manager
//!
//! Contains the types that cross the boundary between the supervisor core
//! and whatever request layer sits in front of it: revisions, persisted
//! records, admin response payloads, and the logging setup every component
//! uses.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod store;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{
    // Admin surface payloads
    ApplyUpdateResponse, CheckUpdateResponse, StartResponse, StartStatus, StatusResponse, StopResponse,
    StopStatus, UpdateStatus,

    // Persisted records
    AutoUpdateConfig, FeedUpdateInfo,
};
