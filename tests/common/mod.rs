//! Shared test utilities for mkd-replay
//!
//! This module provides common helpers for integration tests:
//! - Recording directory fixtures with synthetic PNG frames
//! - Action list builders

pub mod actions;
pub mod recording_fixtures;
