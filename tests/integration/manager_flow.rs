//! Integration tests for the replay manager
//!
//! Covers recording discovery, mode availability and the info projection.

use super::common::actions::mixed_session;
use super::common::recording_fixtures::TestRecording;
use mkd_replay::replay::{
    ActionExecutor, ActionReplayEngine, ChannelKeyListener, ReplayError, ReplayManager,
    ReplayMode, ReplayOptions, ReplayStatus, SafetyMonitor, SimulatedInput,
};
use std::sync::Arc;

fn manager() -> ReplayManager {
    ReplayManager::new(ActionReplayEngine::new(
        ActionExecutor::new(Arc::new(SimulatedInput::new())),
        SafetyMonitor::new(Arc::new(ChannelKeyListener::new())),
    ))
}

/// A full recording exposes both modes and a metadata summary
#[test]
fn test_full_recording_info() {
    let recording = TestRecording::new()
        .with_frames(6)
        .with_actions_json(&mixed_session())
        .with_metadata(serde_json::json!({
            "duration": 3.0,
            "platform": "linux",
            "action_count": 6,
            "recorded_at": "2026-05-04T09:30:00Z"
        }));

    let mut manager = manager();
    assert!(manager.load_recording(recording.path()));

    let info = manager.get_recording_info().expect("Info should exist");
    assert_eq!(info.path, recording.path());
    assert_eq!(info.frame_count, 6);
    assert_eq!(info.action_count, 6);
    assert_eq!(info.duration, 3.0);
    assert_eq!(info.platform.as_deref(), Some("linux"));
    assert!(info.has_screenshots && info.has_actions && info.has_metadata);
    assert_eq!(
        info.available_modes,
        vec![ReplayMode::Visual, ReplayMode::Action]
    );
}

/// Actions embedded in metadata.json are used when no action file exists
#[test]
fn test_actions_from_metadata() {
    let actions = serde_json::to_value(mixed_session()).expect("Failed to serialize actions");
    let recording = TestRecording::new().with_metadata(serde_json::json!({
        "duration": 2.5,
        "platform": "windows",
        "action_count": 6,
        "actions": actions,
    }));

    let mut manager = manager();
    assert!(manager.load_recording(recording.path()));
    assert_eq!(manager.action_engine().actions().len(), 6);
    assert_eq!(manager.available_modes(), vec![ReplayMode::Action]);
}

/// Metadata alone, without actions or frames, is not a usable recording
#[test]
fn test_metadata_only_is_rejected() {
    let recording = TestRecording::new().with_metadata(serde_json::json!({
        "duration": 1.0,
        "platform": "linux",
        "action_count": 0
    }));
    let mut manager = manager();
    assert!(!manager.load_recording(recording.path()));
    assert!(matches!(
        manager.launch_replay(ReplayMode::Visual, ReplayOptions::dry_run()),
        Err(ReplayError::NoRecordingLoaded)
    ));
}

/// A corrupt action file does not hide the screenshots
#[test]
fn test_corrupt_actions_with_frames_loads_visual_mode() {
    let recording = TestRecording::new().with_frames(6);
    std::fs::write(recording.path().join("actions.json"), "{ truncated")
        .expect("Failed to write actions.json");

    let mut manager = manager();
    assert!(manager.load_recording(recording.path()));

    let info = manager.get_recording_info().expect("Info should exist");
    assert_eq!(info.frame_count, 6);
    assert_eq!(info.action_count, 0);
    assert!(!info.has_actions);
    assert_eq!(info.available_modes, vec![ReplayMode::Visual]);
    assert!(matches!(
        manager.launch_replay(ReplayMode::Action, ReplayOptions::dry_run()),
        Err(ReplayError::ModeUnavailable(ReplayMode::Action))
    ));
}

/// Frames under screenshots/ are discovered
#[test]
fn test_nested_screenshots() {
    let recording = TestRecording::new().with_nested_frames(3);
    let mut manager = manager();
    assert!(manager.load_recording(recording.path()));
    assert_eq!(manager.visual_engine().frame_count(), 3);
    assert!(manager
        .launch_replay(ReplayMode::Visual, ReplayOptions::dry_run())
        .is_ok());
}

/// Loading a new recording replaces the previous one
#[tokio::test]
async fn test_reload_replaces_recording() {
    let first = TestRecording::new().with_actions_json(&mixed_session());
    let second = TestRecording::new().with_frames(2);

    let mut manager = manager();
    assert!(manager.load_recording(first.path()));
    manager
        .launch_replay(ReplayMode::Action, ReplayOptions::dry_run())
        .expect("Replay should start");
    assert_eq!(
        manager.action_engine_mut().wait().await,
        ReplayStatus::Completed
    );

    assert!(manager.load_recording(second.path()));
    assert_eq!(manager.action_engine().status(), ReplayStatus::Idle);
    assert!(manager.action_engine().actions().is_empty());
    assert_eq!(manager.available_modes(), vec![ReplayMode::Visual]);
}

/// A recording cannot be swapped out from under a running replay
#[tokio::test(start_paused = true)]
async fn test_load_refused_while_running() {
    let first = TestRecording::new().with_actions_json(&mixed_session());
    let second = TestRecording::new().with_frames(1);

    let mut manager = manager();
    assert!(manager.load_recording(first.path()));
    manager
        .launch_replay(ReplayMode::Action, ReplayOptions::dry_run())
        .expect("Replay should start");

    assert!(!manager.load_recording(second.path()));
    assert_eq!(manager.get_recording_info().map(|i| i.action_count), Some(6));

    manager.action_engine().stop_replay();
    assert_eq!(
        manager.action_engine_mut().wait().await,
        ReplayStatus::Stopped
    );
}
