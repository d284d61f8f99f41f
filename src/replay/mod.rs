//! Replay of recorded user-interaction sessions.
//!
//! Two consumers share one recording:
//! - [`ActionReplayEngine`] drives input devices from the action list, on a
//!   background task guarded by a [`SafetyMonitor`]
//! - [`VisualReplayEngine`] draws annotations onto the captured screenshots
//!
//! [`ReplayManager`] loads a recording directory and dispatches to either.

pub mod action;
pub mod annotation;
pub mod draw;
pub mod engine;
pub mod executor;
pub mod input;
pub mod manager;
pub mod observer;
pub mod options;
pub mod recording;
pub mod safety;
pub mod visual;

pub use action::{ActionData, ActionKind, ActionRecord, KeyInput, MouseButton, NamedKey};
pub use annotation::{generate_annotations, Annotation, AnnotationKind};
pub use engine::{ActionReplayEngine, ConfirmHook, ReplayError, ReplayStatus};
pub use executor::ActionExecutor;
pub use input::{InputBackend, InputCall, InputError, Key, SimulatedInput};
pub use manager::{RecordingInfo, ReplayManager, ReplayMode};
pub use observer::{ChannelObserver, NoopObserver, ReplayEvent, ReplayObserver};
pub use options::{ReplayOptions, WindowRegion};
pub use recording::{RecordingDir, RecordingError, RecordingMetadata, FRAME_RATE};
pub use safety::{ChannelKeyListener, KeyListener, SafetyMonitor, SafetyViolation};
pub use visual::{VisualError, VisualReplayEngine};
