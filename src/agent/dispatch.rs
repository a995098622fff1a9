//! UI dispatch bridge
//!
//! Workers never mutate presentation state directly; the presentation
//! layer is single-threaded. Every update crosses this bridge as a
//! [`UiEvent`] on an unbounded channel, and the UI task drains the
//! receiver in FIFO order. The channel's ordering guarantee is what makes
//! step updates arrive in the order the remote agent produced them, with
//! the terminal event last.

use crate::agent::types::{RunOutcome, StepUpdate};
use crate::scrape::BatchStatus;
use tokio::sync::mpsc;

/// Start/stop affordance state mirrored by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Start enabled, stop disabled
    Idle,
    /// Start disabled, stop enabled
    Running,
    /// Both disabled while the stop request is in flight
    Stopping,
}

/// One scheduled presentation update
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Replace the "thoughts" pane with the latest step
    Thoughts(StepUpdate),

    /// Append one line to the action history log
    ActionLogged(String),

    /// Append one line to the console/output log
    ConsoleLine(String),

    /// Update the start/stop affordances
    Controls(ControlState),

    /// Per-item batch progress
    BatchItem { index: usize, status: BatchStatus },

    /// Terminal banner; always the last event for a run, and always
    /// paired with `Controls(Idle)` so the UI never sticks in a running
    /// affordance state
    RunFinished(RunOutcome),
}

/// Sending half of the bridge; cheap to clone into workers.
#[derive(Clone)]
pub struct UiDispatcher {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiDispatcher {
    /// Create a bridge and the receiver the UI task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Schedule an event on the UI task. A closed receiver means the UI
    /// is gone; the event is dropped and logged, never a panic.
    pub fn dispatch(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("UI receiver closed; dropping dispatch");
        }
    }

    pub fn console(&self, line: impl Into<String>) {
        self.dispatch(UiEvent::ConsoleLine(line.into()));
    }

    pub fn action(&self, line: impl Into<String>) {
        self.dispatch(UiEvent::ActionLogged(line.into()));
    }

    pub fn controls(&self, state: ControlState) {
        self.dispatch(UiEvent::Controls(state));
    }

    /// Deliver the terminal result: banner, finish event, and controls
    /// restored to idle-ready, in that order.
    pub fn finish_run(&self, outcome: RunOutcome) {
        self.console(outcome.banner());
        self.dispatch(UiEvent::RunFinished(outcome));
        self.controls(ControlState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_preserves_order() {
        let (ui, mut rx) = UiDispatcher::channel();
        for i in 0..5 {
            ui.console(format!("line {}", i));
        }
        for i in 0..5 {
            match rx.recv().await.unwrap() {
                UiEvent::ConsoleLine(line) => assert_eq!(line, format!("line {}", i)),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_order_across_clones() {
        // Clones share one channel, so ordering holds across workers
        // dispatching through their own handles sequentially.
        let (ui, mut rx) = UiDispatcher::channel();
        let ui2 = ui.clone();
        ui.console("first");
        ui2.console("second");
        ui.console("third");

        let mut lines = Vec::new();
        for _ in 0..3 {
            if let Some(UiEvent::ConsoleLine(line)) = rx.recv().await {
                lines.push(line);
            }
        }
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_finish_run_sequence() {
        let (ui, mut rx) = UiDispatcher::channel();
        ui.finish_run(RunOutcome::Stopped);

        assert!(matches!(rx.recv().await, Some(UiEvent::ConsoleLine(_))));
        assert!(matches!(
            rx.recv().await,
            Some(UiEvent::RunFinished(RunOutcome::Stopped))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(UiEvent::Controls(ControlState::Idle))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_after_receiver_dropped() {
        let (ui, rx) = UiDispatcher::channel();
        drop(rx);
        // Must not panic
        ui.console("into the void");
    }
}
