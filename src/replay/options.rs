//! Per-run replay configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::replay::action::ActionRecord;

/// Lowest accepted playback speed; anything below is clamped
pub const MIN_PLAYBACK_SPEED: f64 = 0.01;

/// Screen rectangle that positional actions must stay inside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowRegion {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        let (left, top) = (self.x as i64, self.y as i64);
        x >= left && y >= top && x < left + self.width as i64 && y < top + self.height as i64
    }
}

/// Options for one action replay. Fixed for the duration of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOptions {
    /// Multiplier applied to all delays (2.0 replays twice as fast)
    pub playback_speed: f64,
    /// Follow recorded timestamps; otherwise use `fixed_delay` between actions
    pub use_original_timing: bool,
    /// Delay between actions when `use_original_timing` is off
    pub fixed_delay: Duration,
    pub skip_mouse_moves: bool,
    /// Invoke the observer's visual-feedback hook before each action
    pub show_visual_feedback: bool,
    pub emergency_stop_key: String,
    /// Pause (and retry on resume) instead of skipping a failed action
    pub pause_on_error: bool,
    /// Report skipped failures to the observer when not pausing on error
    pub notify_on_skip: bool,
    pub dry_run: bool,
    /// Ask the confirmation hook before touching real devices
    pub confirm_start: bool,
    pub restrict_to_window: Option<WindowRegion>,
    /// Hard limit on the run's wall-clock time
    pub max_duration: Option<Duration>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            playback_speed: 1.0,
            use_original_timing: true,
            fixed_delay: Duration::from_millis(100),
            skip_mouse_moves: false,
            show_visual_feedback: true,
            emergency_stop_key: "esc".to_string(),
            pause_on_error: false,
            notify_on_skip: true,
            dry_run: false,
            confirm_start: true,
            restrict_to_window: None,
            max_duration: Some(Duration::from_secs(300)),
        }
    }
}

impl ReplayOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.playback_speed = speed;
        self
    }

    pub fn with_max_duration(mut self, limit: Option<Duration>) -> Self {
        self.max_duration = limit;
        self
    }

    /// Playback speed clamped to a usable value
    pub fn speed(&self) -> f64 {
        if self.playback_speed.is_finite() {
            self.playback_speed.max(MIN_PLAYBACK_SPEED)
        } else {
            1.0
        }
    }

    /// Whether this run needs the confirmation hook
    pub fn requires_confirmation(&self) -> bool {
        self.confirm_start && !self.dry_run
    }

    /// Offset from loop start at which `action` is due, in original-timing mode
    pub fn target_offset(&self, action: &ActionRecord) -> Duration {
        let secs = action.timestamp.max(0.0) / self.speed();
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Delay between consecutive actions in fixed-timing mode
    pub fn fixed_step(&self) -> Duration {
        self.fixed_delay.div_f64(self.speed())
    }

    /// Whether `action` falls inside `restrict_to_window`. Actions without a
    /// position (keys, releases) always pass.
    pub fn allows(&self, action: &ActionRecord) -> bool {
        match (self.restrict_to_window, action.position()) {
            (Some(region), Some((x, y))) if action.kind.is_positional() => region.contains(x, y),
            _ => true,
        }
    }
}
