//! Persisted configuration and state records
//!
//! Both records are flat JSON documents read and written wholesale.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::errors::{SharedError, SharedResult};

/// Format of the daily cutoff, e.g. `20:00`
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Auto-update settings
///
/// Missing fields in the stored document fall back to the defaults, so a
/// partial file is merged onto `{ enabled: true, time: "20:00" }`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AutoUpdateConfig {
    pub enabled: bool,
    pub time: String,
}

impl Default for AutoUpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time: "20:00".to_string(),
        }
    }
}

impl AutoUpdateConfig {
    /// Build a config after validating the cutoff format
    pub fn new(enabled: bool, time: impl Into<String>) -> SharedResult<Self> {
        let config = Self {
            enabled,
            time: time.into(),
        };
        config.cutoff()?;
        Ok(config)
    }

    /// Parse the daily cutoff time
    pub fn cutoff(&self) -> SharedResult<NaiveTime> {
        NaiveTime::parse_from_str(self.time.trim(), TIME_OF_DAY_FORMAT).map_err(|_| SharedError::InvalidTimeOfDay {
            input: self.time.clone(),
        })
    }
}

/// Last-updated timestamps per transit feed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct FeedUpdateInfo(BTreeMap<String, Option<String>>);

impl Default for FeedUpdateInfo {
    fn default() -> Self {
        let mut feeds = BTreeMap::new();
        feeds.insert("stm".to_string(), None);
        feeds.insert("exo".to_string(), None);
        Self(feeds)
    }
}

impl FeedUpdateInfo {
    pub fn get(&self, feed: &str) -> Option<&str> {
        self.0.get(feed).and_then(|v| v.as_deref())
    }

    pub fn record(&mut self, feed: impl Into<String>, timestamp: impl Into<String>) {
        self.0.insert(feed.into(), Some(timestamp.into()));
    }
}
