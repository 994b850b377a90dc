//! Core business logic modules
//!
//! This module contains logic with no process, network or filesystem
//! dependencies: the bounded worker log and the once-per-day trigger.

pub mod log_buffer;
pub mod schedule;

pub use log_buffer::{DEFAULT_LOG_CAPACITY, LogBuffer, LogEntry, LogKind};
pub use schedule::{DailyTrigger, TriggerDecision};
