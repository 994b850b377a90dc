//! Message types for the warden admin surface
//!
//! This module organizes the payloads that cross the core boundary:
//! - `admin`: responses returned to the request layer
//! - `config`: persisted records read and written wholesale

pub mod admin;
pub mod config;

pub use admin::{
    ApplyUpdateResponse, CheckUpdateResponse, StartResponse, StartStatus, StatusResponse, StopResponse, StopStatus,
    UpdateStatus,
};

pub use config::{AutoUpdateConfig, FeedUpdateInfo};
