//! Emergency-stop and max-duration watchdog
//!
//! The monitor is armed for the lifetime of one replay run. A background
//! task listens for the configured emergency key and raises a flag; the
//! replay loop polls [`SafetyMonitor::check_safety`] once per iteration.
//! The flag only ever goes from `false` to `true` while armed, so it is a
//! plain atomic rather than a lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Source of key-down events, identified by name (`esc`, `Key.f12`, `q`, ...)
pub trait KeyListener: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<String>;
}

/// [`KeyListener`] fed by hand, e.g. from a signal handler or a test
#[derive(Clone)]
pub struct ChannelKeyListener {
    tx: broadcast::Sender<String>,
}

impl ChannelKeyListener {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Report a key-down event to every subscriber
    pub fn press(&self, key: impl Into<String>) {
        let _ = self.tx.send(key.into());
    }
}

impl Default for ChannelKeyListener {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyListener for ChannelKeyListener {
    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// Reason the monitor refused to let the run continue
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SafetyViolation {
    EmergencyStop,
    DurationExceeded { elapsed: Duration, limit: Duration },
}

impl std::fmt::Display for SafetyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyViolation::EmergencyStop => write!(f, "emergency stop requested"),
            SafetyViolation::DurationExceeded { elapsed, limit } => write!(
                f,
                "max duration of {:.1}s exceeded (elapsed {:.1}s)",
                limit.as_secs_f64(),
                elapsed.as_secs_f64()
            ),
        }
    }
}

struct Armed {
    started_at: Instant,
    max_duration: Option<Duration>,
    listener_task: Option<JoinHandle<()>>,
}

pub struct SafetyMonitor {
    listener: Arc<dyn KeyListener>,
    emergency_stop: Arc<AtomicBool>,
    armed: Mutex<Option<Armed>>,
}

impl SafetyMonitor {
    pub fn new(listener: Arc<dyn KeyListener>) -> Self {
        Self {
            listener,
            emergency_stop: Arc::new(AtomicBool::new(false)),
            armed: Mutex::new(None),
        }
    }

    /// Arm the monitor: reset the flag, start the clock and spawn the key
    /// listener. Re-activating replaces any previous activation.
    ///
    /// Outside a tokio runtime the key listener cannot be spawned; the
    /// duration limit and [`trigger_emergency_stop`](Self::trigger_emergency_stop)
    /// still work.
    pub fn activate(&self, emergency_key: &str, max_duration: Option<Duration>) {
        self.deactivate();
        self.emergency_stop.store(false, Ordering::Release);

        let listener_task = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(listen_for_key(
                self.listener.subscribe(),
                normalize_key(emergency_key),
                self.emergency_stop.clone(),
            ))),
            Err(_) => {
                tracing::warn!("No async runtime; emergency key listener not started");
                None
            }
        };

        *self.armed.lock() = Some(Armed {
            started_at: Instant::now(),
            max_duration,
            listener_task,
        });
        tracing::debug!(
            emergency_key,
            max_duration_secs = max_duration.map(|d| d.as_secs_f64()),
            "Safety monitor activated"
        );
    }

    /// Disarm the monitor and stop the key listener. The emergency flag keeps
    /// its value until the next [`activate`](Self::activate).
    pub fn deactivate(&self) {
        if let Some(armed) = self.armed.lock().take() {
            if let Some(task) = armed.listener_task {
                task.abort();
            }
            tracing::debug!("Safety monitor deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.armed.lock().is_some()
    }

    pub fn trigger_emergency_stop(&self) {
        if !self.emergency_stop.swap(true, Ordering::AcqRel) {
            tracing::warn!("Emergency stop triggered");
        }
    }

    pub fn emergency_stop_requested(&self) -> bool {
        self.emergency_stop.load(Ordering::Acquire)
    }

    pub fn violation(&self) -> Option<SafetyViolation> {
        if self.emergency_stop_requested() {
            return Some(SafetyViolation::EmergencyStop);
        }
        let armed = self.armed.lock();
        let armed = armed.as_ref()?;
        let limit = armed.max_duration?;
        let elapsed = armed.started_at.elapsed();
        (elapsed > limit).then_some(SafetyViolation::DurationExceeded { elapsed, limit })
    }

    /// `true` while the run may continue
    pub fn check_safety(&self) -> bool {
        self.violation().is_none()
    }
}

impl Drop for SafetyMonitor {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn listen_for_key(
    mut rx: broadcast::Receiver<String>,
    emergency_key: String,
    flag: Arc<AtomicBool>,
) {
    loop {
        match rx.recv().await {
            Ok(key) if normalize_key(&key) == emergency_key => {
                if !flag.swap(true, Ordering::AcqRel) {
                    tracing::warn!(key = %key, "Emergency stop key pressed");
                }
                return;
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Key listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Canonical key name: lowercase, no `Key.` prefix, `escape` folded to `esc`
fn normalize_key(key: &str) -> String {
    let key = key.trim();
    let key = key.strip_prefix("Key.").unwrap_or(key);
    match key.to_ascii_lowercase().as_str() {
        "escape" => "esc".to_string(),
        other => other.to_string(),
    }
}
