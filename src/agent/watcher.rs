//! Streaming watcher for an active agent run
//!
//! Consumes the run's stream channel frame by frame, dispatching step
//! updates to the UI until a completion frame, a cancellation, a channel
//! failure, or an idle timeout ends the run. Cancellation is cooperative:
//! every receive is bounded by the poll window, and the watcher checks
//! the shared run state between polls, so a stop request is observed
//! within roughly one poll interval even on a silent channel.

use crate::agent::dispatch::{UiDispatcher, UiEvent};
use crate::agent::state::RunState;
use crate::agent::types::{classify_frame, ActiveRun, Frame, RunOutcome};
use crate::client::StreamChannel;
use crate::error::{Error, Result};
use std::time::Duration;

/// Drive one run's stream to its end.
///
/// `Ok` carries the completed outcome; [`Error::Cancelled`] means a stop
/// request ended the run; any other error is a run failure. The channel
/// is closed on every exit path.
pub async fn watch(
    mut channel: Box<dyn StreamChannel>,
    run: &ActiveRun,
    state: &RunState,
    epoch: u64,
    ui: &UiDispatcher,
    poll: Duration,
    idle_timeout: Duration,
) -> Result<RunOutcome> {
    let mut last_activity = tokio::time::Instant::now();

    loop {
        if state.cancel_requested(epoch) {
            tracing::info!(agent_id = %run.agent_id, "Stop observed; leaving stream");
            channel.close().await;
            return Err(Error::Cancelled);
        }

        if last_activity.elapsed() >= idle_timeout {
            channel.close().await;
            return Err(Error::Stream(format!(
                "No activity on the stream for {:?}",
                idle_timeout
            )));
        }

        let raw = match channel.recv(poll).await {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                channel.close().await;
                // A channel torn down because we stopped the agent is
                // not a fault.
                if state.cancel_requested(epoch) {
                    return Err(Error::Cancelled);
                }
                return Err(e);
            }
        };

        if state.cancel_requested(epoch) {
            tracing::debug!(agent_id = %run.agent_id, "Discarding frame after stop");
            channel.close().await;
            return Err(Error::Cancelled);
        }

        last_activity = tokio::time::Instant::now();

        match classify_frame(&run.agent_id, &raw) {
            Ok(Frame::Step(step)) => {
                ui.action(step.action_description.clone());
                ui.dispatch(UiEvent::Thoughts(step));
            }
            Ok(Frame::Completion(done)) => {
                tracing::info!(agent_id = %run.agent_id, "Run completed");
                channel.close().await;
                return Ok(RunOutcome::Completed {
                    answer: done.answer,
                });
            }
            Err(e) => {
                channel.close().await;
                return Err(e);
            }
        }
    }
}
