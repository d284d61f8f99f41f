//! Front door for hosts: load a recording, pick a mode, launch it

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::replay::engine::{ActionReplayEngine, ReplayError};
use crate::replay::options::ReplayOptions;
use crate::replay::recording::RecordingDir;
use crate::replay::visual::VisualReplayEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Annotated review of the screenshots
    Visual,
    /// Drive input devices from the action list
    Action,
}

impl ReplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayMode::Visual => "visual",
            ReplayMode::Action => "action",
        }
    }
}

impl std::fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only summary of the loaded recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingInfo {
    pub path: PathBuf,
    pub frame_count: usize,
    pub action_count: usize,
    /// Seconds
    pub duration: f64,
    pub platform: Option<String>,
    pub has_screenshots: bool,
    pub has_actions: bool,
    pub has_metadata: bool,
    pub available_modes: Vec<ReplayMode>,
}

pub struct ReplayManager {
    visual: VisualReplayEngine,
    action: ActionReplayEngine,
    recording: Option<RecordingDir>,
}

impl ReplayManager {
    pub fn new(action: ActionReplayEngine) -> Self {
        Self {
            visual: VisualReplayEngine::new(),
            action,
            recording: None,
        }
    }

    pub fn with_visual(mut self, visual: VisualReplayEngine) -> Self {
        self.visual = visual;
        self
    }

    /// Scan `dir` and hand its contents to both engines. Succeeds when the
    /// recording has screenshots or actions; any scan failure is logged and
    /// reported as `false`.
    pub fn load_recording(&mut self, dir: &Path) -> bool {
        if self.action.status().is_active() {
            tracing::warn!(path = %dir.display(), "Cannot load a recording while a replay is running");
            return false;
        }

        let recording = match RecordingDir::scan(dir) {
            Ok(recording) => recording,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to scan recording");
                return false;
            }
        };

        if !recording.has_screenshots() && !recording.has_actions() {
            tracing::warn!(path = %dir.display(), "Recording has neither screenshots nor actions");
            return false;
        }

        self.visual.load_scanned(&recording);
        if let Err(e) = self.action.load_actions(recording.actions.clone()) {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to load actions");
            return false;
        }

        tracing::info!(
            path = %dir.display(),
            frames = recording.frames.len(),
            actions = recording.actions.len(),
            platform = recording.platform().unwrap_or("unknown"),
            "Loaded recording"
        );
        self.recording = Some(recording);
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.recording.is_some()
    }

    pub fn recording(&self) -> Option<&RecordingDir> {
        self.recording.as_ref()
    }

    /// Modes the loaded recording supports
    pub fn available_modes(&self) -> Vec<ReplayMode> {
        let Some(recording) = &self.recording else {
            return Vec::new();
        };
        let mut modes = Vec::with_capacity(2);
        if recording.has_screenshots() {
            modes.push(ReplayMode::Visual);
        }
        if recording.has_actions() {
            modes.push(ReplayMode::Action);
        }
        modes
    }

    /// Start `mode` on the loaded recording.
    ///
    /// Visual mode only checks that frames are available; the host then
    /// renders through [`visual_engine`](Self::visual_engine). Action mode
    /// starts the action replay with `options`.
    pub fn launch_replay(
        &mut self,
        mode: ReplayMode,
        options: ReplayOptions,
    ) -> Result<(), ReplayError> {
        if self.recording.is_none() {
            return Err(ReplayError::NoRecordingLoaded);
        }
        if !self.available_modes().contains(&mode) {
            return Err(ReplayError::ModeUnavailable(mode));
        }

        match mode {
            ReplayMode::Visual => {
                tracing::info!(frames = self.visual.frame_count(), "Visual replay ready");
                Ok(())
            }
            ReplayMode::Action => self.action.start_replay(options),
        }
    }

    pub fn get_recording_info(&self) -> Option<RecordingInfo> {
        let recording = self.recording.as_ref()?;
        Some(RecordingInfo {
            path: recording.root.clone(),
            frame_count: recording.frames.len(),
            action_count: recording.actions.len(),
            duration: recording.duration(),
            platform: recording.platform().map(str::to_string),
            has_screenshots: recording.has_screenshots(),
            has_actions: recording.has_actions(),
            has_metadata: recording.has_metadata(),
            available_modes: self.available_modes(),
        })
    }

    pub fn visual_engine(&self) -> &VisualReplayEngine {
        &self.visual
    }

    pub fn visual_engine_mut(&mut self) -> &mut VisualReplayEngine {
        &mut self.visual
    }

    pub fn action_engine(&self) -> &ActionReplayEngine {
        &self.action
    }

    pub fn action_engine_mut(&mut self) -> &mut ActionReplayEngine {
        &mut self.action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::action::{ActionRecord, MouseButton};
    use crate::replay::engine::ReplayStatus;
    use crate::replay::executor::ActionExecutor;
    use crate::replay::input::SimulatedInput;
    use crate::replay::safety::{ChannelKeyListener, SafetyMonitor};
    use image::{Rgba, RgbaImage};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn manager() -> ReplayManager {
        ReplayManager::new(ActionReplayEngine::new(
            ActionExecutor::new(Arc::new(SimulatedInput::new())),
            SafetyMonitor::new(Arc::new(ChannelKeyListener::new())),
        ))
    }

    fn write_frames(dir: &Path, count: usize) {
        for i in 0..count {
            RgbaImage::from_pixel(32, 24, Rgba([10, 10, 10, 255]))
                .save(dir.join(format!("frame_{i:04}.png")))
                .unwrap();
        }
    }

    fn write_actions(dir: &Path) {
        let actions = vec![
            ActionRecord::mouse_click(0.0, 5, 5, MouseButton::Left),
            ActionRecord::key_press(0.2, "x"),
        ];
        fs::write(
            dir.join("actions.json"),
            serde_json::to_string(&actions).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn launch_requires_a_recording() {
        let mut m = manager();
        assert!(matches!(
            m.launch_replay(ReplayMode::Visual, ReplayOptions::dry_run()),
            Err(ReplayError::NoRecordingLoaded)
        ));
        assert!(m.get_recording_info().is_none());
    }

    #[test]
    fn empty_or_missing_directories_fail_to_load() {
        let dir = tempdir().unwrap();
        let mut m = manager();
        assert!(!m.load_recording(dir.path()));
        assert!(!m.load_recording(&dir.path().join("missing")));
        fs::write(dir.path().join("actions.json"), "not json").unwrap();
        assert!(!m.load_recording(dir.path()));
        assert!(!m.is_loaded());
    }

    #[test]
    fn corrupt_action_file_still_loads_screenshots() {
        let dir = tempdir().unwrap();
        write_frames(dir.path(), 6);
        fs::write(dir.path().join("actions.json"), "{ truncated").unwrap();
        let mut m = manager();
        assert!(m.load_recording(dir.path()));
        assert_eq!(m.available_modes(), vec![ReplayMode::Visual]);
        assert_eq!(m.visual_engine().frame_count(), 6);
        assert!(m.action_engine().actions().is_empty());

        let mut visual = VisualReplayEngine::new();
        assert!(visual.load_recording(dir.path()).unwrap());
        assert!(visual.annotations().is_empty());
    }

    #[test]
    fn screenshots_only_supports_visual_mode() {
        let dir = tempdir().unwrap();
        write_frames(dir.path(), 6);
        let mut m = manager();
        assert!(m.load_recording(dir.path()));

        let info = m.get_recording_info().unwrap();
        assert_eq!(info.frame_count, 6);
        assert_eq!(info.action_count, 0);
        assert_eq!(info.available_modes, vec![ReplayMode::Visual]);
        assert!(!info.has_metadata);

        assert!(m
            .launch_replay(ReplayMode::Visual, ReplayOptions::dry_run())
            .is_ok());
        assert!(matches!(
            m.launch_replay(ReplayMode::Action, ReplayOptions::dry_run()),
            Err(ReplayError::ModeUnavailable(ReplayMode::Action))
        ));
    }

    #[tokio::test]
    async fn actions_only_supports_action_mode() {
        let dir = tempdir().unwrap();
        write_actions(dir.path());
        let mut m = manager();
        assert!(m.load_recording(dir.path()));
        assert_eq!(m.available_modes(), vec![ReplayMode::Action]);
        assert!(matches!(
            m.launch_replay(ReplayMode::Visual, ReplayOptions::dry_run()),
            Err(ReplayError::ModeUnavailable(ReplayMode::Visual))
        ));

        m.launch_replay(ReplayMode::Action, ReplayOptions::dry_run())
            .unwrap();
        assert_eq!(m.action_engine_mut().wait().await, ReplayStatus::Completed);
        assert_eq!(m.action_engine().executor().invocation_count(), 2);
    }

    #[test]
    fn info_serializes_for_hosts() {
        let dir = tempdir().unwrap();
        write_frames(dir.path(), 2);
        write_actions(dir.path());
        fs::write(
            dir.path().join("metadata.json"),
            r#"{"duration": 4.0, "platform": "darwin", "action_count": 2}"#,
        )
        .unwrap();
        let mut m = manager();
        assert!(m.load_recording(dir.path()));

        let json = serde_json::to_value(m.get_recording_info().unwrap()).unwrap();
        assert_eq!(json["duration"], 4.0);
        assert_eq!(json["platform"], "darwin");
        assert_eq!(json["available_modes"], serde_json::json!(["visual", "action"]));
        assert_eq!(m.visual_engine().annotations().len(), 2);
    }
}
