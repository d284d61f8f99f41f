//! Recorded action model
//!
//! An [`ActionRecord`] is one atomic input event captured during recording,
//! stamped with its offset (in seconds) from the start of the recording.

use serde::{Deserialize, Serialize};

/// Kind of recorded input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MouseMove,
    MouseClick,
    MousePress,
    MouseRelease,
    KeyPress,
    KeyRelease,
    Scroll,
    /// Any type string this build does not understand. Kept so that a
    /// recording from a newer recorder still loads; never executed.
    #[serde(other)]
    Unknown,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::MouseMove => "mouse_move",
            ActionKind::MouseClick => "mouse_click",
            ActionKind::MousePress => "mouse_press",
            ActionKind::MouseRelease => "mouse_release",
            ActionKind::KeyPress => "key_press",
            ActionKind::KeyRelease => "key_release",
            ActionKind::Scroll => "scroll",
            ActionKind::Unknown => "unknown",
        }
    }

    /// Whether actions of this kind carry a screen position
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            ActionKind::MouseMove
                | ActionKind::MouseClick
                | ActionKind::MousePress
                | ActionKind::Scroll
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific payload of an action.
///
/// Every field is optional on the wire; which ones are required depends on
/// the [`ActionKind`] and is checked at execution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressed: Option<bool>,
}

/// One recorded input event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Seconds since recording start
    pub timestamp: f64,
    #[serde(default)]
    pub data: ActionData,
}

impl ActionRecord {
    pub fn new(kind: ActionKind, timestamp: f64, data: ActionData) -> Self {
        Self {
            kind,
            timestamp,
            data,
        }
    }

    pub fn mouse_move(timestamp: f64, x: i32, y: i32) -> Self {
        Self::new(
            ActionKind::MouseMove,
            timestamp,
            ActionData {
                x: Some(x),
                y: Some(y),
                ..Default::default()
            },
        )
    }

    pub fn mouse_click(timestamp: f64, x: i32, y: i32, button: MouseButton) -> Self {
        Self::new(
            ActionKind::MouseClick,
            timestamp,
            ActionData {
                x: Some(x),
                y: Some(y),
                button: Some(button.as_str().to_string()),
                pressed: Some(true),
                ..Default::default()
            },
        )
    }

    pub fn mouse_press(timestamp: f64, x: i32, y: i32, button: MouseButton) -> Self {
        Self::new(
            ActionKind::MousePress,
            timestamp,
            ActionData {
                x: Some(x),
                y: Some(y),
                button: Some(button.as_str().to_string()),
                pressed: Some(true),
                ..Default::default()
            },
        )
    }

    pub fn mouse_release(timestamp: f64, x: i32, y: i32, button: MouseButton) -> Self {
        Self::new(
            ActionKind::MouseRelease,
            timestamp,
            ActionData {
                x: Some(x),
                y: Some(y),
                button: Some(button.as_str().to_string()),
                pressed: Some(false),
                ..Default::default()
            },
        )
    }

    pub fn key_press(timestamp: f64, key: impl Into<String>) -> Self {
        Self::new(
            ActionKind::KeyPress,
            timestamp,
            ActionData {
                key: Some(key.into()),
                ..Default::default()
            },
        )
    }

    pub fn key_release(timestamp: f64, key: impl Into<String>) -> Self {
        Self::new(
            ActionKind::KeyRelease,
            timestamp,
            ActionData {
                key: Some(key.into()),
                ..Default::default()
            },
        )
    }

    pub fn scroll(timestamp: f64, x: i32, y: i32, dx: i32, dy: i32) -> Self {
        Self::new(
            ActionKind::Scroll,
            timestamp,
            ActionData {
                x: Some(x),
                y: Some(y),
                dx: Some(dx),
                dy: Some(dy),
                ..Default::default()
            },
        )
    }

    /// Screen position, if both coordinates were recorded
    pub fn position(&self) -> Option<(i32, i32)> {
        match (self.data.x, self.data.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    /// Parsed mouse button; defaults to left when none was recorded.
    /// `None` means a button was recorded but could not be understood.
    pub fn button(&self) -> Option<MouseButton> {
        match self.data.button.as_deref() {
            None => Some(MouseButton::Left),
            Some(raw) => MouseButton::parse(raw),
        }
    }
}

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Parse `left`, `Button.left`, `RIGHT`, ...
    pub fn parse(s: &str) -> Option<Self> {
        let name = s.trim();
        let name = name.strip_prefix("Button.").unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "left" => Some(MouseButton::Left),
            "right" => Some(MouseButton::Right),
            "middle" => Some(MouseButton::Middle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }

    /// Single-letter label used by the visual overlay
    pub fn label(&self) -> &'static str {
        match self {
            MouseButton::Left => "L",
            MouseButton::Right => "R",
            MouseButton::Middle => "M",
        }
    }
}

/// Named (non-printable) keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedKey {
    Enter,
    Escape,
    Tab,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Shift,
    Ctrl,
    Alt,
    Cmd,
    CapsLock,
    F(u8),
}

impl NamedKey {
    /// Parse the name part of a `Key.<name>` token
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let key = match name.as_str() {
            "enter" | "return" => NamedKey::Enter,
            "esc" | "escape" => NamedKey::Escape,
            "tab" => NamedKey::Tab,
            "space" => NamedKey::Space,
            "backspace" => NamedKey::Backspace,
            "delete" => NamedKey::Delete,
            "insert" => NamedKey::Insert,
            "home" => NamedKey::Home,
            "end" => NamedKey::End,
            "page_up" => NamedKey::PageUp,
            "page_down" => NamedKey::PageDown,
            "up" => NamedKey::Up,
            "down" => NamedKey::Down,
            "left" => NamedKey::Left,
            "right" => NamedKey::Right,
            "shift" | "shift_l" | "shift_r" => NamedKey::Shift,
            "ctrl" | "ctrl_l" | "ctrl_r" => NamedKey::Ctrl,
            "alt" | "alt_l" | "alt_r" | "alt_gr" => NamedKey::Alt,
            "cmd" | "cmd_l" | "cmd_r" => NamedKey::Cmd,
            "caps_lock" => NamedKey::CapsLock,
            other => {
                let n: u8 = other.strip_prefix('f')?.parse().ok()?;
                if (1..=24).contains(&n) {
                    NamedKey::F(n)
                } else {
                    return None;
                }
            }
        };
        Some(key)
    }

    /// Short label for overlays and logs
    pub fn label(&self) -> String {
        match self {
            NamedKey::Enter => "Enter".into(),
            NamedKey::Escape => "Esc".into(),
            NamedKey::Tab => "Tab".into(),
            NamedKey::Space => "Space".into(),
            NamedKey::Backspace => "Backspace".into(),
            NamedKey::Delete => "Del".into(),
            NamedKey::Insert => "Ins".into(),
            NamedKey::Home => "Home".into(),
            NamedKey::End => "End".into(),
            NamedKey::PageUp => "PgUp".into(),
            NamedKey::PageDown => "PgDn".into(),
            NamedKey::Up => "Up".into(),
            NamedKey::Down => "Down".into(),
            NamedKey::Left => "Left".into(),
            NamedKey::Right => "Right".into(),
            NamedKey::Shift => "Shift".into(),
            NamedKey::Ctrl => "Ctrl".into(),
            NamedKey::Alt => "Alt".into(),
            NamedKey::Cmd => "Cmd".into(),
            NamedKey::CapsLock => "Caps".into(),
            NamedKey::F(n) => format!("F{n}"),
        }
    }
}

/// Decoded form of a recorded key token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    Named(NamedKey),
    Char(char),
    /// Free text that is neither a named key nor a single character
    Text(String),
}

/// Why a key token could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTokenError {
    Empty,
    UnknownNamedKey(String),
}

impl std::fmt::Display for KeyTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyTokenError::Empty => write!(f, "empty key token"),
            KeyTokenError::UnknownNamedKey(name) => write!(f, "unknown named key: {name}"),
        }
    }
}

impl std::error::Error for KeyTokenError {}

impl KeyInput {
    /// Decode a key token: `Key.<name>` is a named key, one character is a
    /// printable key, anything else is text.
    pub fn parse(token: &str) -> Result<Self, KeyTokenError> {
        if token.is_empty() {
            return Err(KeyTokenError::Empty);
        }
        if let Some(name) = token.strip_prefix("Key.") {
            return NamedKey::parse(name)
                .map(KeyInput::Named)
                .ok_or_else(|| KeyTokenError::UnknownNamedKey(name.to_string()));
        }
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(KeyInput::Char(c)),
            _ => Ok(KeyInput::Text(token.to_string())),
        }
    }

    /// Human-readable label used in overlays
    pub fn label(&self) -> String {
        match self {
            KeyInput::Named(key) => key.label(),
            KeyInput::Char(c) => c.to_string(),
            KeyInput::Text(text) => text.clone(),
        }
    }
}
