//! Host callbacks for action replay

use tokio::sync::mpsc;

use crate::replay::action::ActionRecord;

/// Receives progress and outcome notifications from the replay worker.
///
/// Called from the worker task, so implementations must not block for long.
/// Every method has a no-op default.
pub trait ReplayObserver: Send + Sync {
    /// An action finished (successfully or skipped); `fraction` is in `(0, 1]`
    fn on_progress(&self, _fraction: f64, _action: &ActionRecord) {}

    /// Every action has been processed
    fn on_complete(&self) {}

    /// Safety stop, paused-on-error, or worker failure
    fn on_error(&self, _message: &str) {}

    /// An action failed and was skipped (only with `notify_on_skip`)
    fn on_action_skipped(&self, _index: usize, _action: &ActionRecord) {}

    /// About to execute `action` (only with `show_visual_feedback`)
    fn on_visual_feedback(&self, _action: &ActionRecord) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReplayObserver for NoopObserver {}

/// Replay notifications forwarded by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    Progress { fraction: f64, action: ActionRecord },
    Complete,
    Error(String),
    ActionSkipped { index: usize, action: ActionRecord },
    VisualFeedback(ActionRecord),
}

/// Forwards every callback as a [`ReplayEvent`] over an unbounded channel,
/// so a single-threaded host can drain them on its own schedule.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ReplayEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReplayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ReplayEvent) {
        // Host may have dropped the receiver; nothing to do then.
        let _ = self.tx.send(event);
    }
}

impl ReplayObserver for ChannelObserver {
    fn on_progress(&self, fraction: f64, action: &ActionRecord) {
        self.send(ReplayEvent::Progress {
            fraction,
            action: action.clone(),
        });
    }

    fn on_complete(&self) {
        self.send(ReplayEvent::Complete);
    }

    fn on_error(&self, message: &str) {
        self.send(ReplayEvent::Error(message.to_string()));
    }

    fn on_action_skipped(&self, index: usize, action: &ActionRecord) {
        self.send(ReplayEvent::ActionSkipped {
            index,
            action: action.clone(),
        });
    }

    fn on_visual_feedback(&self, action: &ActionRecord) {
        self.send(ReplayEvent::VisualFeedback(action.clone()));
    }
}
