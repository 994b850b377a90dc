//! Test fixtures and data for warden tests
//!
//! Consistent revisions, schedule times and worker commands shared by all
//! test suites.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use shared::Revision;
use warden::services::WorkerCommand;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Installed and remote revisions
    pub const LOCAL_REV: &'static str = "abc123";
    pub const REMOTE_REV: &'static str = "def456";
    pub const LONG_LOCAL_REV: &'static str = "0123456789abcdef0123456789abcdef01234567";

    /// Default daily cutoff
    pub const CUTOFF: &'static str = "20:00";

    pub fn local_rev() -> Revision {
        Revision::parse(Self::LOCAL_REV).unwrap()
    }

    pub fn remote_rev() -> Revision {
        Revision::parse(Self::REMOTE_REV).unwrap()
    }

    /// A fixed calendar day used by the schedule tests
    pub fn day(offset: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10 + offset).unwrap()
    }

    pub fn at(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
        day.and_hms_opt(hour, minute, 0).unwrap()
    }

    /// Worker running an inline shell script
    pub fn shell_worker(script: &str, working_dir: &Path) -> WorkerCommand {
        WorkerCommand::new("sh", vec!["-c".to_string(), script.to_string()], working_dir)
    }
}
