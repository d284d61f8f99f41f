//! Integration tests for visual review
//!
//! Loads synthetic recordings and checks what gets drawn on which frame.

use super::common::actions::mixed_session;
use super::common::recording_fixtures::{TestRecording, BACKGROUND, FRAME_HEIGHT, FRAME_WIDTH};
use mkd_replay::config::Config;
use mkd_replay::replay::{
    ActionRecord, AnnotationKind, MouseButton, VisualError, VisualReplayEngine,
};
use tempfile::TempDir;

/// Screenshots without actions load cleanly and render untouched
#[test]
fn test_screenshots_only_renders_original_frames() {
    let recording = TestRecording::new().with_frames(6);
    let mut engine = VisualReplayEngine::new();

    assert!(engine
        .load_recording(recording.path())
        .expect("Load should succeed"));
    assert!(engine.annotations().is_empty());

    let rendered = engine.render_frame(0).expect("Render should succeed");
    let original = image::open(recording.frame_path(0))
        .expect("Failed to open frame")
        .to_rgba8();
    assert_eq!(rendered, original);
}

/// Each click, move and key press gets exactly one annotation
#[test]
fn test_annotations_follow_actions() {
    let recording = TestRecording::new()
        .with_frames(6)
        .with_actions_json(&mixed_session());
    let mut engine = VisualReplayEngine::new();
    engine
        .load_recording(recording.path())
        .expect("Load should succeed");

    let kinds: Vec<&str> = engine.annotations().iter().map(|a| a.kind.as_str()).collect();
    assert_eq!(
        kinds,
        vec![
            "mouse_move",
            "mouse_click",
            "keyboard_input",
            "mouse_move",
            "mouse_click",
            "keyboard_input"
        ]
    );

    // Frame 1 (0.5s) shows the first move's tail and the first click
    let visible: Vec<&str> = engine
        .annotations_at_frame(1)
        .iter()
        .map(|a| a.kind.as_str())
        .collect();
    assert_eq!(visible, vec!["mouse_move", "mouse_click"]);

    let frame = engine.render_frame(1).expect("Render should succeed");
    assert_ne!(*frame.get_pixel(20, 20), BACKGROUND);
}

/// Drags and scrolls are annotated and drawn
#[test]
fn test_drag_and_scroll_annotations() {
    let actions = vec![
        ActionRecord::mouse_press(0.0, 20, 100, MouseButton::Left),
        ActionRecord::mouse_release(0.8, 180, 100, MouseButton::Left),
        ActionRecord::scroll(1.5, 100, 75, 0, 2),
    ];
    let recording = TestRecording::new()
        .with_frames(4)
        .with_actions_json(&actions);
    let mut engine = VisualReplayEngine::new();
    engine
        .load_recording(recording.path())
        .expect("Load should succeed");

    assert!(matches!(
        engine.annotations()[0].kind,
        AnnotationKind::Drag { from: (20, 100) }
    ));
    assert!(matches!(
        engine.annotations()[1].kind,
        AnnotationKind::Scroll { dx: 0, dy: 2 }
    ));

    // Midpoint of the drag line on frame 1 (0.5s)
    let frame = engine.render_frame(1).expect("Render should succeed");
    assert_ne!(*frame.get_pixel(100, 100), BACKGROUND);

    // Scroll up draws an arrow above its position on frame 3 (1.5s)
    let frame = engine.render_frame(3).expect("Render should succeed");
    assert_ne!(*frame.get_pixel(100, 60), BACKGROUND);
    assert_eq!(*frame.get_pixel(100, 120), BACKGROUND);
}

/// Every frame can be rendered to disk
#[test]
fn test_render_all_frames_to_directory() {
    let recording = TestRecording::new()
        .with_frames(4)
        .with_actions_json(&mixed_session());
    let engine = {
        let mut engine = Config::default().visual_engine();
        engine
            .load_recording(recording.path())
            .expect("Load should succeed");
        engine
    };

    let out = TempDir::new().expect("Failed to create temp dir");
    for frame in 0..engine.frame_count() {
        engine
            .render_frame_to(frame, &out.path().join(format!("out_{frame}.png")))
            .expect("Render should succeed");
    }
    for frame in 0..4 {
        let dims = image::image_dimensions(out.path().join(format!("out_{frame}.png")))
            .expect("Rendered file should be a PNG");
        assert_eq!(dims, (FRAME_WIDTH, FRAME_HEIGHT));
    }
    assert!(matches!(
        engine.render_frame(4),
        Err(VisualError::FrameOutOfRange { .. })
    ));
}

/// A different capture rate changes which frame an annotation lands on
#[test]
fn test_custom_frame_rate() {
    let recording = TestRecording::new()
        .with_frames(10)
        .with_actions_json(&[ActionRecord::mouse_click(2.0, 50, 50, MouseButton::Middle)]);
    let mut engine = VisualReplayEngine::new().with_frame_rate(4.0);
    engine
        .load_recording(recording.path())
        .expect("Load should succeed");

    assert_eq!(engine.get_frame_at_time(2.0), 8);
    assert!(engine.annotations_at_frame(7).is_empty());
    assert_eq!(engine.annotations_at_frame(8).len(), 1);
    assert_eq!(engine.annotations_at_frame(10).len(), 1);
}

/// Coordinates at the edges of the i32 range load and render
#[test]
fn test_extreme_coordinates_render() {
    let recording = TestRecording::new().with_frames(2).with_actions_json(&[
        ActionRecord::mouse_click(0.0, i32::MAX, 10, MouseButton::Left),
        ActionRecord::mouse_press(0.1, i32::MIN, 75, MouseButton::Right),
        ActionRecord::mouse_release(0.3, i32::MAX, 75, MouseButton::Right),
        ActionRecord::scroll(0.4, 100, i32::MIN, 0, -1),
    ]);
    let mut engine = VisualReplayEngine::new();
    assert!(engine
        .load_recording(recording.path())
        .expect("Load should succeed"));
    assert_eq!(engine.annotations().len(), 3);

    // Frame 1 (0.5s) falls inside all three annotations
    assert_eq!(engine.annotations_at_frame(1).len(), 3);
    let frame = engine.render_frame(1).expect("Render should succeed");
    // The drag line spans the whole frame at y = 75
    assert_ne!(*frame.get_pixel(0, 75), BACKGROUND);
    assert_ne!(*frame.get_pixel(FRAME_WIDTH - 1, 75), BACKGROUND);
}
