//! Timing-accurate action replay
//!
//! [`ActionReplayEngine`] drives a recorded action list through an
//! [`ActionExecutor`] on a background tokio task. The controller side
//! (the host UI) only reads status and issues pause/resume/stop; the worker
//! owns the action cursor.
//!
//! Every action is scheduled against the absolute start of the loop rather
//! than the previous action, so scheduling error does not accumulate over
//! long recordings.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use crate::replay::action::{ActionKind, ActionRecord};
use crate::replay::executor::ActionExecutor;
use crate::replay::manager::ReplayMode;
use crate::replay::observer::{NoopObserver, ReplayObserver};
use crate::replay::options::ReplayOptions;
use crate::replay::safety::{SafetyMonitor, SafetyViolation};
use crate::replay::visual::VisualError;

/// How often a paused worker checks whether it has been resumed
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("No actions loaded")]
    NoActions,
    #[error("Replay already in progress")]
    AlreadyRunning,
    #[error("Replay start was not confirmed")]
    NotConfirmed,
    #[error("No async runtime available for the replay worker")]
    NoRuntime,
    #[error("No recording loaded")]
    NoRecordingLoaded,
    #[error("{0} replay is not available for this recording")]
    ModeUnavailable(ReplayMode),
    #[error("Visual replay failed: {0}")]
    Visual(#[from] VisualError),
}

/// Replay state machine.
///
/// `Idle -> Running <-> Paused -> {Stopped | Error | Completed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    Idle,
    Running,
    Paused,
    Stopped,
    Error,
    Completed,
}

impl ReplayStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReplayStatus::Stopped | ReplayStatus::Error | ReplayStatus::Completed
        )
    }

    /// Running or paused: a worker owns the cursor
    pub fn is_active(&self) -> bool {
        matches!(self, ReplayStatus::Running | ReplayStatus::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayStatus::Idle => "idle",
            ReplayStatus::Running => "running",
            ReplayStatus::Paused => "paused",
            ReplayStatus::Stopped => "stopped",
            ReplayStatus::Error => "error",
            ReplayStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ReplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asked before a replay that will drive real devices. Receives the run's
/// options and the number of actions; returns whether to proceed.
pub type ConfirmHook = Arc<dyn Fn(&ReplayOptions, usize) -> bool + Send + Sync>;

/// State of one run, shared between the controller and the worker.
///
/// A fresh session is created by every `start_replay`, so a worker left over
/// from an earlier run only ever sees its own (terminal) status.
struct ReplaySession {
    run_id: Uuid,
    status: Mutex<ReplayStatus>,
    /// Written only by the worker
    cursor: AtomicUsize,
    total: usize,
    started_at: Option<Instant>,
}

impl ReplaySession {
    fn idle(total: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: Mutex::new(ReplayStatus::Idle),
            cursor: AtomicUsize::new(0),
            total,
            started_at: None,
        }
    }

    fn running(total: usize) -> Self {
        Self {
            status: Mutex::new(ReplayStatus::Running),
            started_at: Some(Instant::now()),
            ..Self::idle(total)
        }
    }

    fn status(&self) -> ReplayStatus {
        *self.status.lock()
    }

    fn transition(&self, from: ReplayStatus, to: ReplayStatus) -> bool {
        let mut status = self.status.lock();
        if *status == from {
            *status = to;
            true
        } else {
            false
        }
    }

    /// Move an active run to a terminal state. Returns `false` if the run had
    /// already ended (e.g. stopped by the controller).
    fn finish(&self, to: ReplayStatus) -> bool {
        let mut status = self.status.lock();
        if status.is_active() {
            *status = to;
            true
        } else {
            false
        }
    }

    fn advance(&self, index: usize) {
        debug_assert!(index >= self.cursor.load(Ordering::Relaxed));
        debug_assert!(index <= self.total);
        self.cursor.store(index, Ordering::Release);
    }

    fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

pub struct ActionReplayEngine {
    executor: Arc<ActionExecutor>,
    safety: Arc<SafetyMonitor>,
    observer: Arc<dyn ReplayObserver>,
    confirm: Option<ConfirmHook>,
    actions: Arc<Vec<ActionRecord>>,
    session: Arc<ReplaySession>,
    worker: Option<JoinHandle<()>>,
}

impl ActionReplayEngine {
    pub fn new(executor: ActionExecutor, safety: SafetyMonitor) -> Self {
        Self {
            executor: Arc::new(executor),
            safety: Arc::new(safety),
            observer: Arc::new(NoopObserver),
            confirm: None,
            actions: Arc::new(Vec::new()),
            session: Arc::new(ReplaySession::idle(0)),
            worker: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReplayObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_confirmation(mut self, hook: ConfirmHook) -> Self {
        self.confirm = Some(hook);
        self
    }

    /// Replace the action list. Not allowed while a run is active.
    pub fn load_actions(&mut self, actions: Vec<ActionRecord>) -> Result<(), ReplayError> {
        if self.status().is_active() {
            return Err(ReplayError::AlreadyRunning);
        }
        tracing::debug!(count = actions.len(), "Loaded actions for replay");
        self.session = Arc::new(ReplaySession::idle(actions.len()));
        self.actions = Arc::new(actions);
        Ok(())
    }

    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn safety_monitor(&self) -> &SafetyMonitor {
        &self.safety
    }

    pub fn status(&self) -> ReplayStatus {
        self.session.status()
    }

    pub fn current_action_index(&self) -> usize {
        self.session.cursor()
    }

    /// Fraction of actions processed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.session.total == 0 {
            return 0.0;
        }
        self.session.cursor() as f64 / self.session.total as f64
    }

    /// Identifier of the current (or most recent) run, for log correlation
    pub fn run_id(&self) -> Uuid {
        self.session.run_id
    }

    /// Time since the current run started
    pub fn elapsed(&self) -> Option<Duration> {
        self.session.started_at.map(|t| t.elapsed())
    }

    /// Start replaying the loaded actions on a background task.
    ///
    /// Legal from `Idle` or any terminal state. Unless `options.dry_run` is
    /// set, the confirmation hook must approve the run first; without a hook
    /// the run is refused.
    pub fn start_replay(&mut self, options: ReplayOptions) -> Result<(), ReplayError> {
        if self.status().is_active() {
            return Err(ReplayError::AlreadyRunning);
        }
        if self.actions.is_empty() {
            return Err(ReplayError::NoActions);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ReplayError::NoRuntime)?;

        if options.requires_confirmation() {
            let approved = match &self.confirm {
                Some(hook) => hook(&options, self.actions.len()),
                None => {
                    tracing::warn!("Replay requires confirmation but no confirmation hook is set");
                    false
                }
            };
            if !approved {
                return Err(ReplayError::NotConfirmed);
            }
        }

        if let Some(previous) = self.worker.take() {
            previous.abort();
        }

        let session = Arc::new(ReplaySession::running(self.actions.len()));
        self.session = session.clone();
        self.safety
            .activate(&options.emergency_stop_key, options.max_duration);

        tracing::info!(
            run_id = %session.run_id,
            actions = self.actions.len(),
            dry_run = options.dry_run,
            speed = options.speed(),
            original_timing = options.use_original_timing,
            "Starting action replay"
        );

        let worker = ReplayWorker {
            session: session.clone(),
            actions: self.actions.clone(),
            options,
            executor: self.executor.clone(),
            safety: self.safety.clone(),
            observer: self.observer.clone(),
        };
        let inner = runtime.spawn(worker.run());

        let safety = self.safety.clone();
        let observer = self.observer.clone();
        self.worker = Some(runtime.spawn(async move {
            if let Err(err) = inner.await {
                if err.is_panic() && session.finish(ReplayStatus::Error) {
                    safety.deactivate();
                    tracing::error!(run_id = %session.run_id, "Replay worker panicked");
                    observer.on_error("Replay worker crashed");
                }
            }
        }));
        Ok(())
    }

    /// Running -> Paused. Returns whether the state changed.
    pub fn pause_replay(&self) -> bool {
        let changed = self
            .session
            .transition(ReplayStatus::Running, ReplayStatus::Paused);
        if changed {
            tracing::info!(run_id = %self.session.run_id, index = self.current_action_index(), "Replay paused");
        }
        changed
    }

    /// Paused -> Running. Returns whether the state changed.
    pub fn resume_replay(&self) -> bool {
        let changed = self
            .session
            .transition(ReplayStatus::Paused, ReplayStatus::Running);
        if changed {
            tracing::info!(run_id = %self.session.run_id, index = self.current_action_index(), "Replay resumed");
        }
        changed
    }

    /// Stop the run. The worker notices on its next iteration. A run that has
    /// already ended keeps its terminal status.
    pub fn stop_replay(&self) {
        let changed = {
            let mut status = self.session.status.lock();
            if status.is_terminal() {
                false
            } else {
                *status = ReplayStatus::Stopped;
                true
            }
        };
        self.safety.deactivate();
        if changed {
            tracing::info!(run_id = %self.session.run_id, index = self.current_action_index(), "Replay stopped");
        }
    }

    /// Wait for the worker to exit and return the final status
    pub async fn wait(&mut self) -> ReplayStatus {
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
        self.status()
    }
}

impl Drop for ActionReplayEngine {
    fn drop(&mut self) {
        if self.status().is_active() {
            self.stop_replay();
        }
    }
}

/// Everything the background task needs for one run
struct ReplayWorker {
    session: Arc<ReplaySession>,
    actions: Arc<Vec<ActionRecord>>,
    options: ReplayOptions,
    executor: Arc<ActionExecutor>,
    safety: Arc<SafetyMonitor>,
    observer: Arc<dyn ReplayObserver>,
}

impl ReplayWorker {
    async fn run(self) {
        let total = self.actions.len();
        let mut index = 0usize;
        let mut loop_start = Instant::now();
        let mut paused_since: Option<Instant> = None;
        // Index whose pre-action delay has already been served
        let mut waited: Option<usize> = None;

        while index < total {
            match self.session.status() {
                ReplayStatus::Running => {
                    // Time spent paused does not count against the schedule
                    if let Some(since) = paused_since.take() {
                        loop_start += since.elapsed();
                    }
                }
                ReplayStatus::Paused => {
                    paused_since.get_or_insert_with(Instant::now);
                    sleep(PAUSE_POLL_INTERVAL).await;
                    continue;
                }
                status => {
                    tracing::debug!(run_id = %self.session.run_id, %status, index, "Replay worker exiting");
                    return;
                }
            }

            if let Some(violation) = self.safety.violation() {
                self.stop_for_safety(index, violation);
                return;
            }

            let action = &self.actions[index];

            if self.options.skip_mouse_moves && action.kind == ActionKind::MouseMove {
                index += 1;
                self.session.advance(index);
                continue;
            }

            if waited != Some(index) {
                waited = Some(index);
                let delay = self.delay_before(index, action, loop_start);
                if !delay.is_zero() {
                    sleep(delay).await;
                    // Re-run the state and safety checks before acting
                    continue;
                }
            }

            let succeeded = if self.options.allows(action) {
                if self.options.show_visual_feedback {
                    self.observer.on_visual_feedback(action);
                }
                self.executor.execute_action(action, self.options.dry_run)
            } else {
                tracing::warn!(
                    run_id = %self.session.run_id,
                    index,
                    kind = %action.kind,
                    "Action outside the restricted window"
                );
                false
            };

            if !succeeded {
                if self.options.pause_on_error {
                    if self
                        .session
                        .transition(ReplayStatus::Running, ReplayStatus::Paused)
                    {
                        tracing::warn!(run_id = %self.session.run_id, index, "Action failed; replay paused");
                        self.observer.on_error(&format!(
                            "Action {} ({}) failed; replay paused",
                            index + 1,
                            action.kind
                        ));
                    }
                    continue;
                }
                tracing::warn!(run_id = %self.session.run_id, index, kind = %action.kind, "Action failed; skipping");
                if self.options.notify_on_skip {
                    self.observer.on_action_skipped(index, action);
                }
            }

            index += 1;
            self.session.advance(index);
            self.observer.on_progress(index as f64 / total as f64, action);
        }

        if self.session.finish(ReplayStatus::Completed) {
            self.safety.deactivate();
            tracing::info!(
                run_id = %self.session.run_id,
                actions = total,
                "Replay completed"
            );
            self.observer.on_complete();
        }
    }

    /// Delay to serve before executing `action`
    fn delay_before(&self, index: usize, action: &ActionRecord, loop_start: Instant) -> Duration {
        if self.options.use_original_timing {
            self.options
                .target_offset(action)
                .saturating_sub(loop_start.elapsed())
        } else if index == 0 {
            Duration::ZERO
        } else {
            self.options.fixed_step()
        }
    }

    fn stop_for_safety(&self, index: usize, violation: SafetyViolation) {
        if self.session.finish(ReplayStatus::Stopped) {
            self.safety.deactivate();
            tracing::warn!(
                run_id = %self.session.run_id,
                index,
                %violation,
                "Safety stop triggered"
            );
            self.observer
                .on_error(&format!("Safety stop triggered: {violation}"));
        }
    }
}
