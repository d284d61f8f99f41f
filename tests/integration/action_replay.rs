//! Integration tests for action replay
//!
//! Drives recordings through the manager into the action engine with a
//! simulated input device and a paused tokio clock.

use super::common::actions::{mixed_session, moves_and_clicks, spaced_key_presses};
use super::common::recording_fixtures::TestRecording;
use mkd_replay::replay::{
    ActionExecutor, ActionReplayEngine, ChannelKeyListener, ChannelObserver, InputCall,
    ReplayEvent, ReplayManager, ReplayMode, ReplayOptions, ReplayStatus, SafetyMonitor,
    SimulatedInput,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

struct Rig {
    manager: ReplayManager,
    input: SimulatedInput,
    keys: ChannelKeyListener,
    events: UnboundedReceiver<ReplayEvent>,
}

fn rig(recording: &TestRecording) -> Rig {
    let input = SimulatedInput::new();
    let keys = ChannelKeyListener::new();
    let (observer, events) = ChannelObserver::new();
    let engine = ActionReplayEngine::new(
        ActionExecutor::new(Arc::new(input.clone())),
        SafetyMonitor::new(Arc::new(keys.clone())),
    )
    .with_observer(Arc::new(observer))
    .with_confirmation(Arc::new(|_, _| true));

    let mut manager = ReplayManager::new(engine);
    assert!(
        manager.load_recording(recording.path()),
        "Recording should load"
    );
    Rig {
        manager,
        input,
        keys,
        events,
    }
}

fn drain(events: &mut UnboundedReceiver<ReplayEvent>) -> Vec<ReplayEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Dry run with moves skipped completes and only runs the non-move actions
#[tokio::test(start_paused = true)]
async fn test_dry_run_skipping_moves() {
    let recording = TestRecording::new().with_actions_json(&mixed_session());
    let mut rig = rig(&recording);

    let options = ReplayOptions {
        skip_mouse_moves: true,
        dry_run: true,
        use_original_timing: false,
        ..ReplayOptions::default()
    };
    rig.manager
        .launch_replay(ReplayMode::Action, options)
        .expect("Replay should start");

    let engine = rig.manager.action_engine_mut();
    assert_eq!(engine.wait().await, ReplayStatus::Completed);
    assert_eq!(engine.current_action_index(), 6);
    assert_eq!(engine.executor().invocation_count(), 4);
    assert_eq!(rig.input.call_count(), 0, "Dry run must not touch the device");
}

/// A duration limit shorter than the recording stops the run early
#[tokio::test(start_paused = true)]
async fn test_duration_limit_stops_replay() {
    let recording = TestRecording::new().with_actions_json(&spaced_key_presses(4, 2.0));
    let mut rig = rig(&recording);

    let options = ReplayOptions::default().with_max_duration(Some(Duration::from_secs(1)));
    rig.manager
        .launch_replay(ReplayMode::Action, options)
        .expect("Replay should start");

    let engine = rig.manager.action_engine_mut();
    assert_eq!(engine.wait().await, ReplayStatus::Stopped);
    assert!(engine.current_action_index() < 4);

    let errors: Vec<String> = drain(&mut rig.events)
        .into_iter()
        .filter_map(|e| match e {
            ReplayEvent::Error(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1, "Exactly one safety error expected");
    assert!(
        errors[0].contains("max duration"),
        "Error should cite the duration: {}",
        errors[0]
    );
}

/// N moves and M clicks with moves skipped: M executions, cursor past all N+M
#[tokio::test(start_paused = true)]
async fn test_skip_moves_invariant() {
    let (moves, clicks) = (7, 3);
    let recording = TestRecording::new().with_actions_jsonl(&moves_and_clicks(moves, clicks));
    let mut rig = rig(&recording);

    let options = ReplayOptions {
        skip_mouse_moves: true,
        ..ReplayOptions::default()
    };
    rig.manager
        .launch_replay(ReplayMode::Action, options)
        .expect("Replay should start");

    let engine = rig.manager.action_engine_mut();
    assert_eq!(engine.wait().await, ReplayStatus::Completed);
    assert_eq!(engine.executor().invocation_count(), clicks as u64);
    assert_eq!(engine.current_action_index(), moves + clicks);
    assert!(rig
        .input
        .calls()
        .iter()
        .all(|c| matches!(c, InputCall::Click { .. })));
}

/// The cursor never moves backwards and never passes the end
#[tokio::test(start_paused = true)]
async fn test_cursor_is_monotonic() {
    let recording = TestRecording::new().with_actions_json(&spaced_key_presses(20, 0.25));
    let mut rig = rig(&recording);
    rig.manager
        .launch_replay(ReplayMode::Action, ReplayOptions::dry_run())
        .expect("Replay should start");

    let mut last = 0;
    let mut samples = 0;
    while !rig.manager.action_engine().status().is_terminal() {
        let index = rig.manager.action_engine().current_action_index();
        assert!(index >= last, "Cursor went backwards: {last} -> {index}");
        assert!(index <= 20);
        last = index;
        samples += 1;
        tokio::time::sleep(Duration::from_millis(70)).await;
    }
    assert!(samples > 10);
    assert_eq!(rig.manager.action_engine().current_action_index(), 20);
}

/// Pressing the emergency key mid-run stops the replay
#[tokio::test(start_paused = true)]
async fn test_emergency_key_stops_replay() {
    let recording = TestRecording::new().with_actions_json(&spaced_key_presses(10, 1.0));
    let mut rig = rig(&recording);
    let options = ReplayOptions {
        emergency_stop_key: "f12".into(),
        ..ReplayOptions::default()
    };
    rig.manager
        .launch_replay(ReplayMode::Action, options)
        .expect("Replay should start");

    tokio::time::sleep(Duration::from_millis(3500)).await;
    rig.keys.press("esc");
    rig.keys.press("Key.f12");

    let engine = rig.manager.action_engine_mut();
    assert_eq!(engine.wait().await, ReplayStatus::Stopped);
    assert_eq!(engine.current_action_index(), 4);
    assert_eq!(rig.input.device().typed, "abcd");
}

/// Live replay reproduces the recorded device state
#[tokio::test(start_paused = true)]
async fn test_live_replay_reproduces_device_state() {
    let recording = TestRecording::new().with_actions_json(&mixed_session());
    let mut rig = rig(&recording);
    rig.manager
        .launch_replay(ReplayMode::Action, ReplayOptions::default())
        .expect("Replay should start");

    assert_eq!(
        rig.manager.action_engine_mut().wait().await,
        ReplayStatus::Completed
    );
    let device = rig.input.device();
    assert_eq!(device.cursor, (120, 80));
    assert_eq!(device.typed, "h");

    let events = drain(&mut rig.events);
    assert_eq!(events.last(), Some(&ReplayEvent::Complete));
    let feedback = events
        .iter()
        .filter(|e| matches!(e, ReplayEvent::VisualFeedback(_)))
        .count();
    assert_eq!(feedback, 6);
}

/// A second run can start once the first has finished
#[tokio::test(start_paused = true)]
async fn test_replay_can_run_twice() {
    let recording = TestRecording::new().with_actions_json(&spaced_key_presses(3, 0.1));
    let mut rig = rig(&recording);

    for _ in 0..2 {
        rig.manager
            .launch_replay(ReplayMode::Action, ReplayOptions::default())
            .expect("Replay should start");
        assert_eq!(
            rig.manager.action_engine_mut().wait().await,
            ReplayStatus::Completed
        );
    }
    assert_eq!(rig.input.device().typed, "abcabc");
}
