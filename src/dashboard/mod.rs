// src/dashboard/mod.rs

//! User-visible task reporting.
//!
//! Every queued action gets one dashboard task. The driver moves the task
//! through its states and streams the action's log output into it; what a
//! "dashboard" actually is (terminal UI, log sink, test recorder) is up to
//! the [`Dashboard`] implementation.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

/// Lifecycle states a dashboard task can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    /// Rolled back; waiting for missing entities.
    Blocked,
    /// Committed as a successful build step.
    Done,
    /// Committed as a passing test.
    Passed,
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Blocked => "blocked",
            TaskState::Done => "done",
            TaskState::Passed => "passed",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One row on the dashboard.
pub trait Task: Send + Sync {
    fn set_state(&self, state: TaskState);

    /// Append text to the task's output stream.
    fn add_output(&self, text: &str);
}

pub trait Dashboard: Send + Sync {
    fn begin_task(&self, verb: &str, display_name: &str) -> Arc<dyn Task>;
}

/// Dashboard that reports through `tracing` instead of drawing a UI.
#[derive(Debug, Clone, Default)]
pub struct ConsoleDashboard;

impl Dashboard for ConsoleDashboard {
    fn begin_task(&self, verb: &str, display_name: &str) -> Arc<dyn Task> {
        Arc::new(ConsoleTask {
            verb: verb.to_string(),
            name: display_name.to_string(),
        })
    }
}

struct ConsoleTask {
    verb: String,
    name: String,
}

impl Task for ConsoleTask {
    fn set_state(&self, state: TaskState) {
        match state {
            TaskState::Failed => {
                warn!(verb = %self.verb, task = %self.name, "task failed");
            }
            _ => {
                info!(verb = %self.verb, task = %self.name, state = %state, "task state changed");
            }
        }
    }

    fn add_output(&self, text: &str) {
        for line in text.lines() {
            info!(verb = %self.verb, task = %self.name, "{line}");
        }
    }
}
