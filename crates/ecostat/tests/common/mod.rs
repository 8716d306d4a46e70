//! Shared test utilities for ecostat integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring scripted collaborators into a `Pipeline`
//! - Builders and fixtures for statistics, items, series and config files

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
