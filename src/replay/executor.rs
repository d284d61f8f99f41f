//! Translation of recorded actions into input-backend calls

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::replay::action::{ActionKind, ActionRecord, KeyInput, MouseButton};
use crate::replay::input::{InputBackend, InputError, Key};

/// Why an action could not be turned into backend calls
#[derive(Debug, Clone, PartialEq)]
enum Rejection {
    MissingField(&'static str),
    BadButton(String),
    BadKey(String),
    UnknownKind,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MissingField(field) => write!(f, "missing required field `{field}`"),
            Rejection::BadButton(raw) => write!(f, "unrecognised mouse button {raw:?}"),
            Rejection::BadKey(reason) => write!(f, "{reason}"),
            Rejection::UnknownKind => write!(f, "unknown action type"),
        }
    }
}

/// One backend call planned for an action
#[derive(Debug, Clone, PartialEq)]
enum Step {
    MoveTo(i32, i32),
    Click(i32, i32, MouseButton),
    Press(i32, i32, MouseButton),
    Release(MouseButton),
    TypeKey(Key),
    TypeText(String),
    Scroll(i32, i32),
}

/// Stateless translator from one [`ActionRecord`] to input-backend calls.
///
/// Never panics and never returns an error: every failure (malformed action,
/// backend error, backend panic) is logged and reported as `false`.
pub struct ActionExecutor {
    backend: Arc<dyn InputBackend>,
    invocations: AtomicU64,
}

impl ActionExecutor {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self {
            backend,
            invocations: AtomicU64::new(0),
        }
    }

    /// Number of times [`execute_action`](Self::execute_action) has been called
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Execute one action. Returns `true` on success.
    ///
    /// With `dry_run` set, nothing is sent to the backend and the call always
    /// succeeds.
    pub fn execute_action(&self, action: &ActionRecord, dry_run: bool) -> bool {
        self.invocations.fetch_add(1, Ordering::Relaxed);

        if dry_run {
            tracing::info!(
                kind = %action.kind,
                timestamp = action.timestamp,
                data = ?action.data,
                "Dry run: would execute action"
            );
            return true;
        }

        let steps = match plan(action) {
            Ok(steps) => steps,
            Err(rejection) => {
                tracing::warn!(
                    kind = %action.kind,
                    timestamp = action.timestamp,
                    reason = %rejection,
                    "Skipping malformed action"
                );
                return false;
            }
        };

        let backend = self.backend.as_ref();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            steps.iter().try_for_each(|step| apply(backend, step))
        }));

        match outcome {
            Ok(Ok(())) => true,
            Ok(Err(error)) => {
                tracing::warn!(
                    kind = %action.kind,
                    timestamp = action.timestamp,
                    error = %error,
                    "Input backend failed"
                );
                false
            }
            Err(_) => {
                tracing::error!(
                    kind = %action.kind,
                    timestamp = action.timestamp,
                    "Input backend panicked"
                );
                false
            }
        }
    }
}

fn position(action: &ActionRecord) -> Result<(i32, i32), Rejection> {
    let x = action.data.x.ok_or(Rejection::MissingField("x"))?;
    let y = action.data.y.ok_or(Rejection::MissingField("y"))?;
    Ok((x, y))
}

fn button(action: &ActionRecord) -> Result<MouseButton, Rejection> {
    action
        .button()
        .ok_or_else(|| Rejection::BadButton(action.data.button.clone().unwrap_or_default()))
}

fn key(action: &ActionRecord) -> Result<KeyInput, Rejection> {
    let token = action
        .data
        .key
        .as_deref()
        .ok_or(Rejection::MissingField("key"))?;
    KeyInput::parse(token).map_err(|e| Rejection::BadKey(e.to_string()))
}

fn plan(action: &ActionRecord) -> Result<Vec<Step>, Rejection> {
    match action.kind {
        ActionKind::MouseMove => {
            let (x, y) = position(action)?;
            Ok(vec![Step::MoveTo(x, y)])
        }
        ActionKind::MouseClick => {
            let (x, y) = position(action)?;
            Ok(vec![Step::Click(x, y, button(action)?)])
        }
        ActionKind::MousePress => {
            let (x, y) = position(action)?;
            Ok(vec![Step::Press(x, y, button(action)?)])
        }
        ActionKind::MouseRelease => Ok(vec![Step::Release(button(action)?)]),
        ActionKind::KeyPress => Ok(vec![match key(action)? {
            KeyInput::Named(named) => Step::TypeKey(Key::Named(named)),
            KeyInput::Char(c) => Step::TypeKey(Key::Char(c)),
            KeyInput::Text(text) => Step::TypeText(text),
        }]),
        // type_key already released the key on press
        ActionKind::KeyRelease => key(action).map(|_| Vec::new()),
        ActionKind::Scroll => {
            let (dx, dy) = match (action.data.dx, action.data.dy) {
                (None, None) => return Err(Rejection::MissingField("dy")),
                (dx, dy) => (dx.unwrap_or(0), dy.unwrap_or(0)),
            };
            let mut steps = Vec::with_capacity(2);
            if let Some((x, y)) = action.position() {
                steps.push(Step::MoveTo(x, y));
            }
            steps.push(Step::Scroll(dx, dy));
            Ok(steps)
        }
        ActionKind::Unknown => Err(Rejection::UnknownKind),
    }
}

fn apply(backend: &dyn InputBackend, step: &Step) -> Result<(), InputError> {
    match step {
        Step::MoveTo(x, y) => backend.move_to(*x, *y),
        Step::Click(x, y, b) => backend.click(*x, *y, *b),
        Step::Press(x, y, b) => backend.press(*x, *y, *b),
        Step::Release(b) => backend.release(*b),
        Step::TypeKey(k) => backend.type_key(*k),
        Step::TypeText(text) => backend.type_text(text),
        Step::Scroll(dx, dy) => backend.scroll(*dx, *dy),
    }
}
