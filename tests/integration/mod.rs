//! Integration tests for mkd-replay
//!
//! These tests verify that recording loading, both replay engines and the
//! manager work together correctly.

#[path = "../common/mod.rs"]
pub mod common;

pub mod action_replay;
pub mod manager_flow;
pub mod visual_review;
