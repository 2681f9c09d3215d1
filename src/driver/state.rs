// src/driver/state.rs

//! Per-action bookkeeping held by the driver core.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::dashboard::Task;
use crate::fs::FileHandle;
use crate::types::EntityId;

/// Where an action currently is in its lifecycle.
///
/// The action object travels with the phase: it sits here while the action
/// waits, and is out with the spawner while the action runs. A blocked action
/// carries its missing-dependency map in the tag, so "blocked without missing
/// dependencies" cannot be represented.
pub enum ActionPhase {
    /// Waiting in the pending queue for a free slot.
    Pending { action: Box<dyn Action> },
    /// Handed to the spawner; completion will bring the action object back.
    Running,
    /// Rolled back; waiting for the keyed entities. Values are the human
    /// titles the action gave when it looked the entities up.
    Blocked {
        action: Box<dyn Action>,
        missing: HashMap<EntityId, String>,
    },
}

impl ActionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            ActionPhase::Pending { .. } => "pending",
            ActionPhase::Running => "running",
            ActionPhase::Blocked { .. } => "blocked",
        }
    }
}

impl fmt::Debug for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionPhase::Blocked { missing, .. } => f
                .debug_struct("Blocked")
                .field("missing", &missing.keys().collect::<Vec<_>>())
                .finish_non_exhaustive(),
            other => f.write_str(other.name()),
        }
    }
}

/// Everything the core tracks about one queued action.
pub struct ActionRecord {
    pub verb: String,
    /// Display name of the file the action was made from (diagnostics only).
    pub source_name: String,
    /// Directory where the action may create output files.
    pub tmpdir: FileHandle,
    pub task: Arc<dyn Task>,
    pub phase: ActionPhase,
}

impl fmt::Debug for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRecord")
            .field("verb", &self.verb)
            .field("source", &self.source_name)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
