//! Recording directory fixtures
//!
//! Builds recording directories in a temp dir with synthetic screenshots and
//! action files in the layouts the loader understands.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use mkd_replay::replay::ActionRecord;
use tempfile::TempDir;

pub const FRAME_WIDTH: u32 = 200;
pub const FRAME_HEIGHT: u32 = 150;

/// Background colour of every synthetic frame
pub const BACKGROUND: Rgba<u8> = Rgba([40, 44, 52, 255]);

/// A recording directory that is deleted when dropped
pub struct TestRecording {
    dir: TempDir,
}

impl TestRecording {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `count` frames into the recording root
    pub fn with_frames(self, count: usize) -> Self {
        write_frames(self.path(), count);
        self
    }

    /// Write `count` frames into `screenshots/`
    pub fn with_nested_frames(self, count: usize) -> Self {
        let nested = self.path().join("screenshots");
        fs::create_dir_all(&nested).expect("Failed to create screenshots dir");
        write_frames(&nested, count);
        self
    }

    pub fn with_actions_json(self, actions: &[ActionRecord]) -> Self {
        let json = serde_json::to_string_pretty(actions).expect("Failed to serialize actions");
        fs::write(self.path().join("actions.json"), json).expect("Failed to write actions.json");
        self
    }

    pub fn with_actions_jsonl(self, actions: &[ActionRecord]) -> Self {
        let lines: Vec<String> = actions
            .iter()
            .map(|a| serde_json::to_string(a).expect("Failed to serialize action"))
            .collect();
        fs::write(self.path().join("actions.jsonl"), lines.join("\n"))
            .expect("Failed to write actions.jsonl");
        self
    }

    pub fn with_metadata(self, metadata: serde_json::Value) -> Self {
        fs::write(
            self.path().join("metadata.json"),
            serde_json::to_string_pretty(&metadata).expect("Failed to serialize metadata"),
        )
        .expect("Failed to write metadata.json");
        self
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.path().join(frame_name(index))
    }
}

pub fn frame_name(index: usize) -> String {
    format!("frame_{index:04}.png")
}

fn write_frames(dir: &Path, count: usize) {
    for i in 0..count {
        RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND)
            .save(dir.join(frame_name(i)))
            .expect("Failed to write frame");
    }
}
