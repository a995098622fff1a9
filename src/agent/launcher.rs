//! Task launcher and stop coordinator
//!
//! Owns the run lifecycle end to end: validate inputs, claim the single
//! run slot, start the remote agent, hand the stream to the watcher, and
//! deliver the terminal outcome. Whatever ends the run — completion,
//! stop, or failure — exactly one path wins [`RunState::finish`] and
//! dispatches the terminal UI events; the loser stays silent.

use crate::agent::dispatch::{ControlState, UiDispatcher};
use crate::agent::state::{RunState, StopRequest};
use crate::agent::types::{AgentConfig, RunOutcome, TaskDetails};
use crate::agent::watcher;
use crate::client::RemoteClient;
use crate::config::DeckConfig;
use crate::error::{Error, Result};
use crate::validate::check_url;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Coordinates agent task runs against the remote service.
#[derive(Clone)]
pub struct TaskLauncher {
    state: Arc<RunState>,
    client: Arc<dyn RemoteClient>,
    config: Arc<DeckConfig>,
    ui: UiDispatcher,
}

impl TaskLauncher {
    pub fn new(
        state: Arc<RunState>,
        client: Arc<dyn RemoteClient>,
        config: Arc<DeckConfig>,
        ui: UiDispatcher,
    ) -> Self {
        Self {
            state,
            client,
            config,
            ui,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Start a task run.
    ///
    /// Validation failures and [`Error::AlreadyRunning`] are returned
    /// synchronously with no side effects; once this returns `Ok`, the
    /// run slot is claimed and the returned worker will deliver exactly
    /// one terminal dispatch.
    pub fn launch(
        &self,
        agent_config: AgentConfig,
        details: TaskDetails,
    ) -> Result<JoinHandle<()>> {
        let task = details.task.trim().to_string();
        if task.is_empty() {
            return Err(Error::Validation(
                "Task description must not be empty".to_string(),
            ));
        }
        agent_config.validate()?;

        let url = details
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from);
        if let Some(u) = &url {
            check_url(u)?;
        }

        let epoch = self.state.begin()?;

        let details = TaskDetails { task, url };
        self.ui.controls(ControlState::Running);
        self.ui.console(format!("Starting task: {}", details.task));

        let state = self.state.clone();
        let client = self.client.clone();
        let config = self.config.clone();
        let ui = self.ui.clone();
        Ok(tokio::spawn(async move {
            let outcome =
                match drive(&*client, &config, &state, epoch, &ui, agent_config, details).await {
                    Ok(outcome) => outcome,
                    Err(Error::Cancelled) => RunOutcome::Stopped,
                    Err(e) => {
                        tracing::error!(%e, "Task run failed");
                        RunOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
            if state.finish(epoch) {
                ui.finish_run(outcome);
            }
        }))
    }

    /// Request cancellation of the active run.
    ///
    /// No-op when idle, including a run that reached its terminal just
    /// before this call: the Idle check and the Stopping transition are
    /// one atomic step, so no UI feedback is dispatched after the
    /// terminal already restored idle-ready controls. When the remote
    /// agent is started, spawns the remote stop call and returns its
    /// handle.
    pub fn request_stop(&self) -> Option<JoinHandle<()>> {
        let (run, epoch) = match self.state.request_stop() {
            StopRequest::Idle => return None,
            StopRequest::Starting => {
                // No agent started yet: the worker sees Stopping at its
                // next check and winds down on its own.
                self.ui.controls(ControlState::Stopping);
                self.ui.console("Stopping agent...");
                return None;
            }
            StopRequest::Active { run, epoch } => (run, epoch),
        };

        self.ui.controls(ControlState::Stopping);
        self.ui.console("Stopping agent...");

        let state = self.state.clone();
        let client = self.client.clone();
        let ui = self.ui.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = client.stop_agent(&run).await {
                tracing::warn!(agent_id = %run.agent_id, %e, "Remote stop call failed");
            }
            if state.finish(epoch) {
                ui.finish_run(RunOutcome::Stopped);
            }
        }))
    }
}

async fn drive(
    client: &dyn RemoteClient,
    config: &DeckConfig,
    state: &RunState,
    epoch: u64,
    ui: &UiDispatcher,
    agent_config: AgentConfig,
    details: TaskDetails,
) -> Result<RunOutcome> {
    let run = client.start_agent(&agent_config, &details).await?;
    state.mark_running(run.clone());

    let channel = client.open_stream(&run).await?;
    watcher::watch(
        channel,
        &run,
        state,
        epoch,
        ui,
        config.stream.poll_interval(),
        config.stream.idle_timeout(),
    )
    .await
}
