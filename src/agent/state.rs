//! Shared run state and exactly-once termination
//!
//! `RunState` is the single piece of mutable state shared between the UI
//! task and workers. The launcher populates it, workers read it to detect
//! cancellation, and whichever path wins [`RunState::finish`] owns the
//! terminal dispatch. Every run carries an epoch token: workers act on
//! the state only while their epoch is current, so a straggler from a
//! finished run can neither clear a successor's state nor deliver a
//! second terminal for it. Readers must tolerate the state flipping to
//! cleared between checks; that race is benign.

use crate::agent::types::ActiveRun;
use crate::error::{Error, Result};
use std::sync::Mutex;

/// Lifecycle of the single task run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Outcome of a stop request
#[derive(Debug, Clone, PartialEq)]
pub enum StopRequest {
    /// Nothing to stop
    Idle,
    /// Stop noted before the remote agent existed; the launch worker
    /// observes it and winds down on its own
    Starting,
    /// Stop noted; the caller should issue the remote stop for this run
    Active { run: ActiveRun, epoch: u64 },
}

struct Inner {
    status: RunStatus,
    run: Option<ActiveRun>,
    epoch: u64,
}

/// Process-wide run state; share via `Arc`.
///
/// Invariant: `status != Idle` implies a launch is in flight; `run` is
/// present from the moment the remote agent was started until the state
/// is cleared. The epoch increments on every claimed launch and never
/// repeats.
pub struct RunState {
    inner: Mutex<Inner>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: RunStatus::Idle,
                run: None,
                epoch: 0,
            }),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.inner.lock().expect("run state poisoned").status
    }

    /// Snapshot of the active run identity, if any
    pub fn active_run(&self) -> Option<ActiveRun> {
        self.inner.lock().expect("run state poisoned").run.clone()
    }

    /// Claim the run slot: Idle -> Starting.
    ///
    /// Returns the new run's epoch token. Fails with
    /// [`Error::AlreadyRunning`] without side effects when a run is
    /// already in flight; the check and the transition are one atomic
    /// step, so two racing launches cannot both succeed.
    pub fn begin(&self) -> Result<u64> {
        let mut inner = self.inner.lock().expect("run state poisoned");
        if inner.status != RunStatus::Idle {
            return Err(Error::AlreadyRunning);
        }
        inner.status = RunStatus::Starting;
        inner.epoch += 1;
        Ok(inner.epoch)
    }

    /// Record the started agent: Starting -> Running.
    pub fn mark_running(&self, run: ActiveRun) {
        let mut inner = self.inner.lock().expect("run state poisoned");
        // A stop request may have arrived while the agent was starting;
        // keep Stopping so the watcher exits on its first poll.
        if inner.status == RunStatus::Starting {
            inner.status = RunStatus::Running;
        }
        inner.run = Some(run);
    }

    /// Request cancellation: Running/Starting -> Stopping.
    ///
    /// The identity snapshot and epoch in [`StopRequest::Active`] are
    /// captured under the lock, before any race can clear them, for the
    /// remote stop call and its terminal-dispatch claim.
    pub fn request_stop(&self) -> StopRequest {
        let mut inner = self.inner.lock().expect("run state poisoned");
        match inner.status {
            RunStatus::Idle => StopRequest::Idle,
            _ => {
                inner.status = RunStatus::Stopping;
                match inner.run.clone() {
                    Some(run) => StopRequest::Active {
                        run,
                        epoch: inner.epoch,
                    },
                    None => StopRequest::Starting,
                }
            }
        }
    }

    /// True once the given run should wind down: a stop was requested,
    /// the state was cleared, or another run has taken the slot.
    pub fn cancel_requested(&self, epoch: u64) -> bool {
        let inner = self.inner.lock().expect("run state poisoned");
        inner.epoch != epoch || matches!(inner.status, RunStatus::Stopping | RunStatus::Idle)
    }

    /// Clear the state back to Idle, but only for the given run.
    ///
    /// Returns `true` for exactly one caller per epoch; that caller owns
    /// the terminal dispatch. Callers holding a stale epoch always get
    /// `false`, so a straggler cannot clear a successor run.
    pub fn finish(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock().expect("run state poisoned");
        if inner.status == RunStatus::Idle || inner.epoch != epoch {
            return false;
        }
        inner.status = RunStatus::Idle;
        inner.run = None;
        true
    }
}
