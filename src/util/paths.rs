//! Path utilities for mkd data directories

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Must be called early in main() before any other path functions are used.
/// If custom_path is None, uses the default ~/.mkd location.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

/// Get the default data directory path (~/.mkd)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".mkd"))
        .unwrap_or_else(|| PathBuf::from(".mkd"))
}

/// Get the base data directory.
/// Returns the custom path if set via init_data_dir(), otherwise ~/.mkd
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Get the logs directory (~/.mkd/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the default log file path (~/.mkd/logs/mkd-replay.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("mkd-replay.log")
}

/// Get the config file path (~/.mkd/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Get the default recordings directory (~/.mkd/recordings)
pub fn recordings_dir() -> PathBuf {
    data_dir().join("recordings")
}

/// Resolve a recording argument. A relative path that does not exist from
/// the working directory is looked up under [`recordings_dir`].
pub fn resolve_recording_path(path: &Path) -> PathBuf {
    resolve_under(&recordings_dir(), path)
}

fn resolve_under(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    let candidate = base.join(path);
    if candidate.exists() {
        candidate
    } else {
        path.to_path_buf()
    }
}
