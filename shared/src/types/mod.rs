//! Core types used throughout the warden system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters shown when a revision is displayed in short form
pub const SHORT_REVISION_LEN: usize = 8;

/// Component identifier attached to every log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Long-lived host process (CLI, shutdown handling)
    Host,
    /// Worker process supervisor and its log drainer
    Supervisor,
    /// Update strategies and the coordinator
    Updater,
    /// Hourly auto-update loop
    Scheduler,
    /// Delayed auto-start at host boot
    Boot,
    /// Transit-feed archive installation
    Feeds,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Host => write!(f, "host"),
            Component::Supervisor => write!(f, "supervisor"),
            Component::Updater => write!(f, "updater"),
            Component::Scheduler => write!(f, "scheduler"),
            Component::Boot => write!(f, "boot"),
            Component::Feeds => write!(f, "feeds"),
        }
    }
}

/// Content-addressed source revision (a commit hash)
///
/// Two revisions are equal only when their full identifiers match exactly.
/// The short form exists for display and never takes part in comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Build a revision from raw text, trimming surrounding whitespace.
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form: the first eight characters
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_REVISION_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_parse_trims_and_rejects_blank() {
        assert_eq!(Revision::parse("  abc123\n").unwrap().as_str(), "abc123");
        assert!(Revision::parse("   \n").is_none());
    }

    #[test]
    fn test_revision_short_form() {
        let rev = Revision::parse("0123456789abcdef").unwrap();
        assert_eq!(rev.short(), "01234567");

        let tiny = Revision::parse("abc").unwrap();
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_revision_equality_requires_full_match() {
        let full = Revision::parse("0123456789abcdef").unwrap();
        let prefix = Revision::parse("01234567").unwrap();
        assert_ne!(full, prefix);
        assert_eq!(full.short(), prefix.short());
    }

    #[test]
    fn test_component_display() {
        assert_eq!(Component::Supervisor.to_string(), "supervisor");
        assert_eq!(Component::Scheduler.to_string(), "scheduler");
        assert_eq!(Component::Feeds.to_string(), "feeds");
    }
}
