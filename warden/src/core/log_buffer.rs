//! Bounded worker log
//!
//! Holds worker output lines and supervisor lifecycle entries in arrival
//! order. Once the capacity is reached the oldest entries are evicted.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};

pub const DEFAULT_LOG_CAPACITY: usize = 5000;

/// Where a log entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// A line printed by the worker
    Output,
    /// A supervisor lifecycle event (started, stopped, exited)
    Event,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub kind: LogKind,
    pub text: String,
}

impl LogEntry {
    /// Render for display. Events carry their timestamp, worker lines are verbatim.
    pub fn render(&self) -> String {
        match self.kind {
            LogKind::Output => self.text.clone(),
            LogKind::Event => format!("{} - {}", self.at.format("%Y-%m-%d %H:%M:%S%.6f"), self.text),
        }
    }
}

/// Single-writer, multi-reader ring of log entries
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
    evicted: AtomicU64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn push_output(&self, line: impl Into<String>) {
        self.push(LogKind::Output, line.into());
    }

    pub fn push_event(&self, text: impl Into<String>) {
        self.push(LogKind::Event, text.into());
    }

    fn push(&self, kind: LogKind, text: String) {
        let entry = LogEntry {
            at: Local::now(),
            kind,
            text,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        entries.push_back(entry);
    }

    /// Copy of the current entries, oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.iter().cloned().collect()
    }

    /// Newline-joined rendering of every buffered entry
    pub fn render(&self) -> String {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.iter().map(LogEntry::render).collect::<Vec<_>>().join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries dropped to stay within capacity
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
