//! Agent run data model and wire frame classification

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Immutable configuration for one agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Reasoning model identifier, e.g. `gemini/gemini-2.5-flash`
    pub reasoning_model: String,

    /// Maximum number of remote steps (1-100 inclusive)
    pub max_steps: u8,

    /// Attach the credential vault to the run
    pub attach_vault: bool,

    /// Attach the active persona to the run
    pub attach_persona: bool,

    /// Attach file storage to the run
    pub attach_files: bool,
}

impl AgentConfig {
    /// Reject configurations outside the supported step range.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps < 1 || self.max_steps > 100 {
            return Err(Error::Validation(format!(
                "max_steps must be between 1 and 100, got {}",
                self.max_steps
            )));
        }
        if self.reasoning_model.trim().is_empty() {
            return Err(Error::Validation(
                "reasoning_model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the agent is asked to do
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetails {
    /// Free-text task description (required, non-blank)
    pub task: String,

    /// Optional starting URL
    pub url: Option<String>,
}

/// Identity of the active run; produced by the launcher, consumed by the
/// watcher and the stop coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRun {
    pub agent_id: String,
    pub session_id: String,
}

/// One incremental progress frame from the remote agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepUpdate {
    /// What the agent intends to do next
    pub next_goal: String,

    /// Summary of the page currently in front of the agent
    pub page_summary: String,

    /// Description of the action just taken
    #[serde(alias = "action")]
    pub action_description: String,
}

/// Terminal frame carrying the agent's final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionFrame {
    pub agent_id: String,
    pub answer: String,
}

/// A classified stream frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Step(StepUpdate),
    Completion(CompletionFrame),
}

/// Terminal outcome of a run; payload of the final dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The agent delivered its final answer
    Completed { answer: String },

    /// The user stopped the run
    Stopped,

    /// The run failed; `reason` carries the full diagnostic detail
    Failed { reason: String },
}

impl RunOutcome {
    /// Human-readable banner text for the output log
    pub fn banner(&self) -> String {
        match self {
            RunOutcome::Completed { answer } => format!("Task finished.\n{}", answer),
            RunOutcome::Stopped => "Agent stopped by user.".to_string(),
            RunOutcome::Failed { reason } => format!("Task failed: {}", reason),
        }
    }
}

/// Classify a raw text frame from the stream channel.
///
/// The wire protocol has no discriminant field, so frames are decoded
/// defensively by shape: completion first (an `agent_id` matching this
/// run plus an `answer`), then step, and anything else fails closed as a
/// stream error.
pub fn classify_frame(agent_id: &str, raw: &str) -> Result<Frame> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| Error::Stream(format!("Undecodable frame: {}", e)))?;

    if let Ok(done) = CompletionFrame::deserialize(&value) {
        if done.agent_id == agent_id {
            return Ok(Frame::Completion(done));
        }
        tracing::warn!(
            expected = agent_id,
            got = %done.agent_id,
            "Completion-shaped frame for a different agent; ignoring shape"
        );
    }

    if let Ok(step) = StepUpdate::deserialize(&value) {
        return Ok(Frame::Step(step));
    }

    Err(Error::Stream(format!(
        "Frame matches neither completion nor step shape: {}",
        raw
    )))
}
