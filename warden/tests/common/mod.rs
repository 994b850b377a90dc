//! Common test utilities and infrastructure
//!
//! This module provides shared fixtures, builders and helpers used across
//! the warden integration suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{AdminBuilder, CoordinatorBuilder, SchedulerBuilder, TestHelpers};
