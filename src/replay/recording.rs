//! Recording directory scanning
//!
//! A recording is a directory containing any of:
//! - `frame_NNNN.png` screenshots, in the root or in `screenshots/`
//! - an action list: `actions.json`, `actions.jsonl`, or the `actions`
//!   array of `metadata.json`
//! - `metadata.json` with a summary (duration, platform, action count)
//!
//! Scanning only lists frames; pixel data is decoded by the visual engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::replay::action::ActionRecord;

/// Capture rate of recorded screenshots, in frames per second
pub const FRAME_RATE: f64 = 2.0;

const SCREENSHOTS_DIR: &str = "screenshots";
const ACTIONS_JSON: &str = "actions.json";
const ACTIONS_JSONL: &str = "actions.jsonl";
const METADATA_JSON: &str = "metadata.json";

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Recording directory not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Action list in {0} is not a JSON array")]
    NotAnArray(PathBuf),
}

/// Summary written alongside a recording
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub action_count: Option<usize>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Embedded action list, used when no separate action file exists
    #[serde(default, skip_serializing)]
    pub actions: Option<Vec<serde_json::Value>>,
}

/// A screenshot on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFile {
    pub index: u32,
    pub path: PathBuf,
}

/// Result of scanning a recording directory
#[derive(Debug, Clone, Default)]
pub struct RecordingDir {
    pub root: PathBuf,
    /// Sorted by frame index
    pub frames: Vec<FrameFile>,
    pub actions: Vec<ActionRecord>,
    /// File the actions were read from
    pub action_source: Option<PathBuf>,
    pub metadata: Option<RecordingMetadata>,
}

impl RecordingDir {
    pub fn scan(root: &Path) -> Result<Self, RecordingError> {
        if !root.is_dir() {
            return Err(RecordingError::NotFound(root.to_path_buf()));
        }

        let frames = scan_frames(root)?;
        let metadata = load_metadata(&root.join(METADATA_JSON));
        let (actions, action_source) = load_actions(root, metadata.as_ref());

        tracing::debug!(
            root = %root.display(),
            frames = frames.len(),
            actions = actions.len(),
            has_metadata = metadata.is_some(),
            "Scanned recording"
        );

        Ok(Self {
            root: root.to_path_buf(),
            frames,
            actions,
            action_source,
            metadata,
        })
    }

    pub fn has_screenshots(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// Recording length in seconds: from metadata when present, otherwise the
    /// later of the last action and the last frame
    pub fn duration(&self) -> f64 {
        if let Some(duration) = self.metadata.as_ref().and_then(|m| m.duration) {
            return duration;
        }
        let last_action = self.actions.last().map_or(0.0, |a| a.timestamp);
        let frames = self.frames.len() as f64 / FRAME_RATE;
        last_action.max(frames)
    }

    pub fn platform(&self) -> Option<&str> {
        self.metadata.as_ref()?.platform.as_deref()
    }
}

fn frame_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^frame_(\d+)\.png$").ok())
        .as_ref()
}

/// Frames from the root, or from `screenshots/` when the root has none
fn scan_frames(root: &Path) -> Result<Vec<FrameFile>, RecordingError> {
    let frames = list_frames(root)?;
    if !frames.is_empty() {
        return Ok(frames);
    }
    let nested = root.join(SCREENSHOTS_DIR);
    if nested.is_dir() {
        return list_frames(&nested);
    }
    Ok(frames)
}

fn list_frames(dir: &Path) -> Result<Vec<FrameFile>, RecordingError> {
    let Some(pattern) = frame_pattern() else {
        return Ok(Vec::new());
    };

    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(index) = pattern
            .captures(name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        else {
            continue;
        };
        if entry.file_type()?.is_file() {
            frames.push(FrameFile {
                index,
                path: entry.path(),
            });
        }
    }
    frames.sort_by_key(|f| f.index);
    Ok(frames)
}

fn load_metadata(path: &Path) -> Option<RecordingMetadata> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read recording metadata");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed recording metadata");
            None
        }
    }
}

/// First usable action source wins: `actions.json`, `actions.jsonl`, then
/// the `actions` array of the metadata. An unreadable source is skipped.
fn load_actions(
    root: &Path,
    metadata: Option<&RecordingMetadata>,
) -> (Vec<ActionRecord>, Option<PathBuf>) {
    let json = root.join(ACTIONS_JSON);
    if json.is_file() {
        match read_json_array(&json) {
            Ok(items) => return (parse_records(items, &json), Some(json)),
            Err(e) => {
                tracing::warn!(path = %json.display(), error = %e, "Ignoring unreadable action file")
            }
        }
    }

    let jsonl = root.join(ACTIONS_JSONL);
    if jsonl.is_file() {
        match read_json_lines(&jsonl) {
            Ok(items) => return (parse_records(items, &jsonl), Some(jsonl)),
            Err(e) => {
                tracing::warn!(path = %jsonl.display(), error = %e, "Ignoring unreadable action file")
            }
        }
    }

    if let Some(items) = metadata.and_then(|m| m.actions.clone()) {
        let path = root.join(METADATA_JSON);
        return (parse_records(items, &path), Some(path));
    }

    (Vec::new(), None)
}

fn read_json_array(path: &Path) -> Result<Vec<serde_json::Value>, RecordingError> {
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    match value {
        serde_json::Value::Array(items) => Ok(items),
        _ => Err(RecordingError::NotAnArray(path.to_path_buf())),
    }
}

fn read_json_lines(path: &Path) -> Result<Vec<serde_json::Value>, RecordingError> {
    let content = fs::read_to_string(path)?;
    let mut items = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => items.push(value),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = line_no + 1,
                error = %e,
                "Skipping unparseable action line"
            ),
        }
    }
    Ok(items)
}

fn parse_records(items: Vec<serde_json::Value>, source: &Path) -> Vec<ActionRecord> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<ActionRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    path = %source.display(),
                    index = i,
                    error = %e,
                    "Skipping malformed action record"
                );
                None
            }
        })
        .collect()
}
