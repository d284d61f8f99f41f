pub mod config;
pub mod replay;
pub mod util;

pub use config::Config;
pub use replay::{
    ActionExecutor, ActionRecord, ActionReplayEngine, RecordingInfo, ReplayError, ReplayManager,
    ReplayMode, ReplayObserver, ReplayOptions, ReplayStatus, SafetyMonitor, VisualReplayEngine,
};
