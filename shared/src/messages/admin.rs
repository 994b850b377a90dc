//! Admin surface payloads
//!
//! Structured results handed to the request layer. Every operation returns
//! one of these rather than surfacing a raw error.

use serde::{Deserialize, Serialize};

use crate::types::Revision;

/// Delay before a client should reload after a successful update
pub const RELOAD_DELAY_MS: u64 = 3000;

/// Outcome of a worker start request
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    Started,
    AlreadyRunning,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StartResponse {
    pub status: StartStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StartResponse {
    pub fn status(status: StartStatus) -> Self {
        Self { status, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StartStatus::Error,
            error: Some(message.into()),
        }
    }
}

/// Outcome of a worker stop request
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Stopped,
    NotRunning,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StopResponse {
    pub status: StopStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StopResponse {
    pub fn status(status: StopStatus) -> Self {
        Self { status, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StopStatus::Error,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusResponse {
    pub running: bool,
}

/// Result of comparing the local revision against the remote branch tip
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct CheckUpdateResponse {
    pub up_to_date: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_update: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_full: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_full: Option<String>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_git: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckUpdateResponse {
    /// Revision comparison method reported to clients
    pub const METHOD_API: &'static str = "api";

    /// Both revisions known: equality decides
    pub fn compared(local: &Revision, remote: &Revision, has_git: bool) -> Self {
        Self {
            up_to_date: local == remote,
            local: Some(local.short().to_string()),
            remote: Some(remote.short().to_string()),
            local_full: Some(local.to_string()),
            remote_full: Some(remote.to_string()),
            method: Self::METHOD_API.to_string(),
            has_git: Some(has_git),
            ..Default::default()
        }
    }

    /// Local revision indeterminate: assume an update is needed
    pub fn local_unknown() -> Self {
        Self {
            up_to_date: false,
            needs_update: Some(true),
            method: Self::METHOD_API.to_string(),
            error: Some("Could not determine local version".to_string()),
            ..Default::default()
        }
    }

    /// Remote query failed
    pub fn remote_failed(reason: &dyn std::fmt::Display) -> Self {
        Self {
            up_to_date: false,
            method: Self::METHOD_API.to_string(),
            error: Some(format!("Could not get remote commit: {reason}")),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Success,
    Error,
}

/// Result of an update request
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApplyUpdateResponse {
    pub status: UpdateStatus,
    pub message: String,
    pub reload_required: bool,
    pub reload_delay_ms: u64,
}

impl ApplyUpdateResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: UpdateStatus::Success,
            message: message.into(),
            reload_required: true,
            reload_delay_ms: RELOAD_DELAY_MS,
        }
    }

    /// A failed update never asks the client to reload
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: UpdateStatus::Error,
            message: message.into(),
            reload_required: false,
            reload_delay_ms: 0,
        }
    }
}
