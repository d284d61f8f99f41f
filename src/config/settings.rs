use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::replay::annotation::DEFAULT_ANNOTATION_DURATION;
use crate::replay::options::{ReplayOptions, WindowRegion};
use crate::replay::recording::FRAME_RATE;
use crate::replay::visual::VisualReplayEngine;
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Defaults for every action replay
    pub replay: ReplayOptions,
    /// Visual review settings
    pub visual: VisualConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualConfig {
    /// Screenshot capture rate in frames per second
    pub frame_rate: f64,
    /// Seconds an annotation stays visible
    pub annotation_duration: f64,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            frame_rate: FRAME_RATE,
            annotation_duration: DEFAULT_ANNOTATION_DURATION,
        }
    }
}

/// TOML representation of the `[replay]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlReplayConfig {
    pub playback_speed: Option<f64>,
    pub use_original_timing: Option<bool>,
    /// Delay between actions in fixed-timing mode
    pub fixed_delay_ms: Option<u64>,
    pub skip_mouse_moves: Option<bool>,
    pub show_visual_feedback: Option<bool>,
    pub emergency_stop_key: Option<String>,
    pub pause_on_error: Option<bool>,
    pub notify_on_skip: Option<bool>,
    pub dry_run: Option<bool>,
    pub confirm_start: Option<bool>,
    /// 0 disables the limit
    pub max_duration_secs: Option<f64>,
    pub restrict_to_window: Option<WindowRegion>,
}

/// TOML representation of the `[visual]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlVisualConfig {
    pub frame_rate: Option<f64>,
    pub annotation_duration: Option<f64>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub replay: Option<TomlReplayConfig>,
    pub visual: Option<TomlVisualConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            replay: ReplayOptions::default(),
            visual: VisualConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the data directory, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from `path`. A missing or unreadable file yields
    /// the defaults.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read config file");
                }
                return Self::default();
            }
        };

        match toml::from_str::<TomlConfig>(&contents) {
            Ok(toml_config) => Self::default().merged(toml_config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Invalid config file; using defaults");
                Self::default()
            }
        }
    }

    fn merged(mut self, toml_config: TomlConfig) -> Self {
        // Load replay defaults
        if let Some(replay) = toml_config.replay {
            let options = &mut self.replay;
            if let Some(speed) = replay.playback_speed {
                options.playback_speed = speed;
            }
            if let Some(original) = replay.use_original_timing {
                options.use_original_timing = original;
            }
            if let Some(ms) = replay.fixed_delay_ms {
                options.fixed_delay = Duration::from_millis(ms);
            }
            if let Some(skip) = replay.skip_mouse_moves {
                options.skip_mouse_moves = skip;
            }
            if let Some(show) = replay.show_visual_feedback {
                options.show_visual_feedback = show;
            }
            if let Some(key) = replay.emergency_stop_key {
                options.emergency_stop_key = key;
            }
            if let Some(pause) = replay.pause_on_error {
                options.pause_on_error = pause;
            }
            if let Some(notify) = replay.notify_on_skip {
                options.notify_on_skip = notify;
            }
            if let Some(dry_run) = replay.dry_run {
                options.dry_run = dry_run;
            }
            if let Some(confirm) = replay.confirm_start {
                options.confirm_start = confirm;
            }
            if let Some(secs) = replay.max_duration_secs {
                options.max_duration = max_duration_from_secs(secs);
            }
            if replay.restrict_to_window.is_some() {
                options.restrict_to_window = replay.restrict_to_window;
            }
        }

        // Load visual settings
        if let Some(visual) = toml_config.visual {
            if let Some(rate) = visual.frame_rate {
                self.visual.frame_rate = rate;
            }
            if let Some(duration) = visual.annotation_duration {
                self.visual.annotation_duration = duration;
            }
        }

        self
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        // Write the example config
        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    /// Visual engine configured with these settings
    pub fn visual_engine(&self) -> VisualReplayEngine {
        VisualReplayEngine::new()
            .with_frame_rate(self.visual.frame_rate)
            .with_annotation_duration(self.visual.annotation_duration)
    }
}

/// `0` (or anything negative) means unlimited
fn max_duration_from_secs(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn example_config_parses_to_defaults() {
        let parsed: TomlConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(Config::default().merged(parsed), Config::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("config.toml")), Config::default());
    }

    #[test]
    fn user_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[replay]
playback_speed = 2.5
use_original_timing = false
fixed_delay_ms = 250
emergency_stop_key = "f12"
max_duration_secs = 0

[replay.restrict_to_window]
x = 0
y = 0
width = 800
height = 600

[visual]
frame_rate = 4.0
"#,
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.replay.playback_speed, 2.5);
        assert!(!config.replay.use_original_timing);
        assert_eq!(config.replay.fixed_delay, Duration::from_millis(250));
        assert_eq!(config.replay.emergency_stop_key, "f12");
        assert_eq!(config.replay.max_duration, None);
        assert_eq!(
            config.replay.restrict_to_window,
            Some(WindowRegion {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            })
        );
        // Untouched keys keep their defaults
        assert!(config.replay.confirm_start);
        assert_eq!(config.visual.frame_rate, 4.0);
        assert_eq!(config.visual.annotation_duration, DEFAULT_ANNOTATION_DURATION);
        assert_eq!(config.visual_engine().frame_rate(), 4.0);
    }

    #[test]
    fn invalid_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[replay\nplayback_speed = ").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn default_config_is_written_on_first_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::create_default_config(&path);
        assert_eq!(fs::read_to_string(&path).unwrap(), EXAMPLE_CONFIG);
    }
}
