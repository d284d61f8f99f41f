//! Visual markers derived from recorded actions

use serde::Serialize;

use crate::replay::action::{ActionKind, ActionRecord, KeyInput, MouseButton};

/// How long an annotation stays on screen, in seconds
pub const DEFAULT_ANNOTATION_DURATION: f64 = 0.5;

/// Minimum press-to-release distance for a press/release pair to count as a drag
const DRAG_THRESHOLD_PX: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationKind {
    MouseClick { button: MouseButton },
    MouseMove,
    KeyboardInput { text: String },
    WindowFocus { title: String },
    Scroll { dx: i32, dy: i32 },
    /// Drawn from `from` to the annotation's position
    Drag { from: (i32, i32) },
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::MouseClick { .. } => "mouse_click",
            AnnotationKind::MouseMove => "mouse_move",
            AnnotationKind::KeyboardInput { .. } => "keyboard_input",
            AnnotationKind::WindowFocus { .. } => "window_focus",
            AnnotationKind::Scroll { .. } => "scroll",
            AnnotationKind::Drag { .. } => "drag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    #[serde(flatten)]
    pub kind: AnnotationKind,
    /// Seconds from the start of the recording
    pub timestamp: f64,
    pub position: (i32, i32),
    pub duration: f64,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, timestamp: f64, position: (i32, i32)) -> Self {
        Self {
            kind,
            timestamp,
            position,
            duration: DEFAULT_ANNOTATION_DURATION,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    pub fn end(&self) -> f64 {
        self.timestamp + self.duration
    }

    /// Visible on the closed interval `[timestamp, timestamp + duration]`
    pub fn is_visible_at(&self, t: f64) -> bool {
        t >= self.timestamp && t <= self.end()
    }

    /// How far through its lifetime the annotation is at `t`, in `[0, 1]`
    pub fn progress_at(&self, t: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((t - self.timestamp) / self.duration).clamp(0.0, 1.0)
    }
}

struct PendingPress {
    position: (i32, i32),
    timestamp: f64,
    button: Option<MouseButton>,
}

/// Build the annotations for an action list, ordered by timestamp.
///
/// Clicks, moves and key presses map one-to-one. Scrolls get an arrow, and a
/// press/release pair that moved far enough becomes a drag. Actions without a
/// position are placed at the last known cursor position.
pub fn generate_annotations(actions: &[ActionRecord], duration: f64) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    let mut cursor = (0, 0);
    let mut pending: Option<PendingPress> = None;

    for action in actions {
        let position = action.position();
        if let Some(pos) = position {
            cursor = pos;
        }

        let kind = match action.kind {
            ActionKind::MouseClick => Some(AnnotationKind::MouseClick {
                button: action.button().unwrap_or(MouseButton::Left),
            }),
            ActionKind::MouseMove if position.is_some() => Some(AnnotationKind::MouseMove),
            ActionKind::KeyPress => action.data.key.as_deref().map(|token| {
                let text = KeyInput::parse(token)
                    .map(|k| k.label())
                    .unwrap_or_else(|_| token.to_string());
                AnnotationKind::KeyboardInput { text }
            }),
            ActionKind::Scroll => Some(AnnotationKind::Scroll {
                dx: action.data.dx.unwrap_or(0),
                dy: action.data.dy.unwrap_or(0),
            }),
            ActionKind::MousePress => {
                pending = Some(PendingPress {
                    position: cursor,
                    timestamp: action.timestamp,
                    button: action.button(),
                });
                None
            }
            ActionKind::MouseRelease => {
                if let Some(press) = pending.take().filter(|p| p.button == action.button()) {
                    let (fx, fy) = press.position;
                    let distance = (f64::from(cursor.0) - f64::from(fx))
                        .hypot(f64::from(cursor.1) - f64::from(fy));
                    if distance >= DRAG_THRESHOLD_PX {
                        let held = (action.timestamp - press.timestamp).max(duration);
                        annotations.push(
                            Annotation::new(
                                AnnotationKind::Drag { from: press.position },
                                press.timestamp,
                                cursor,
                            )
                            .with_duration(held),
                        );
                    }
                }
                None
            }
            _ => None,
        };

        if let Some(kind) = kind {
            annotations
                .push(Annotation::new(kind, action.timestamp, cursor).with_duration(duration));
        }
    }

    // Drags are pushed at release time but start at the press
    annotations.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    annotations
}
