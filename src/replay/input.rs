//! Input simulation backend
//!
//! The executor is the only caller of an [`InputBackend`]; everything that
//! changes real device state goes through this trait. Platform injection
//! lives outside this crate. [`SimulatedInput`] records calls in memory
//! instead of touching devices, which is what tests and rehearsals use.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::replay::action::{MouseButton, NamedKey};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Input backend unavailable: {0}")]
    Unavailable(String),
    #[error("Input rejected by backend: {0}")]
    Rejected(String),
    #[error("Unsupported input: {0}")]
    Unsupported(String),
}

/// Key handed to [`InputBackend::type_key`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Named(NamedKey),
    Char(char),
}

/// Capabilities needed to replay recorded input
pub trait InputBackend: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> Result<(), InputError>;

    fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<(), InputError>;

    fn press(&self, x: i32, y: i32, button: MouseButton) -> Result<(), InputError>;

    fn release(&self, button: MouseButton) -> Result<(), InputError>;

    /// Press and release a single key
    fn type_key(&self, key: Key) -> Result<(), InputError>;

    /// Type free text character by character
    fn type_text(&self, text: &str) -> Result<(), InputError>;

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InputError>;
}

/// A call captured by [`SimulatedInput`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCall {
    MoveTo { x: i32, y: i32 },
    Click { x: i32, y: i32, button: MouseButton },
    Press { x: i32, y: i32, button: MouseButton },
    Release { button: MouseButton },
    TypeKey(Key),
    TypeText(String),
    Scroll { dx: i32, dy: i32 },
}

/// Simulated device state kept by [`SimulatedInput`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedDevice {
    pub cursor: (i32, i32),
    pub buttons_down: Vec<MouseButton>,
    pub typed: String,
    pub scrolled: (i64, i64),
}

/// In-memory backend that records every call and tracks a fake device.
///
/// Cloning shares the underlying log, so a test can keep one handle and give
/// another to the executor.
#[derive(Clone, Default)]
pub struct SimulatedInput {
    calls: Arc<Mutex<Vec<InputCall>>>,
    device: Arc<Mutex<SimulatedDevice>>,
    fail_all: Arc<Mutex<Option<InputError>>>,
}

impl SimulatedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `error`
    pub fn failing_with(self, error: InputError) -> Self {
        *self.fail_all.lock() = Some(error);
        self
    }

    /// All calls captured so far
    pub fn calls(&self) -> Vec<InputCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn device(&self) -> SimulatedDevice {
        self.device.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
        *self.device.lock() = SimulatedDevice::default();
    }

    fn record(
        &self,
        call: InputCall,
        apply: impl FnOnce(&mut SimulatedDevice),
    ) -> Result<(), InputError> {
        if let Some(error) = self.fail_all.lock().clone() {
            return Err(error);
        }
        apply(&mut self.device.lock());
        self.calls.lock().push(call);
        Ok(())
    }
}

impl InputBackend for SimulatedInput {
    fn move_to(&self, x: i32, y: i32) -> Result<(), InputError> {
        self.record(InputCall::MoveTo { x, y }, |d| d.cursor = (x, y))
    }

    fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<(), InputError> {
        self.record(InputCall::Click { x, y, button }, |d| d.cursor = (x, y))
    }

    fn press(&self, x: i32, y: i32, button: MouseButton) -> Result<(), InputError> {
        self.record(InputCall::Press { x, y, button }, |d| {
            d.cursor = (x, y);
            if !d.buttons_down.contains(&button) {
                d.buttons_down.push(button);
            }
        })
    }

    fn release(&self, button: MouseButton) -> Result<(), InputError> {
        self.record(InputCall::Release { button }, |d| {
            d.buttons_down.retain(|b| *b != button)
        })
    }

    fn type_key(&self, key: Key) -> Result<(), InputError> {
        self.record(InputCall::TypeKey(key), |d| {
            if let Key::Char(c) = key {
                d.typed.push(c);
            }
        })
    }

    fn type_text(&self, text: &str) -> Result<(), InputError> {
        self.record(InputCall::TypeText(text.to_string()), |d| {
            d.typed.push_str(text)
        })
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InputError> {
        self.record(InputCall::Scroll { dx, dy }, |d| {
            d.scrolled.0 += dx as i64;
            d.scrolled.1 += dy as i64;
        })
    }
}
