//! Agent run coordination: launch, watch, stop.

pub mod dispatch;
pub mod launcher;
pub mod state;
pub mod types;
pub mod watcher;

pub use dispatch::{ControlState, UiDispatcher, UiEvent};
pub use launcher::TaskLauncher;
pub use state::{RunState, RunStatus};
pub use types::{ActiveRun, AgentConfig, RunOutcome, StepUpdate, TaskDetails};
