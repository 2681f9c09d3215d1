// src/driver/context.rs

//! The capability surface a running action sees.
//!
//! A `BuildContext` is created when an action is dispatched and lives for one
//! run. Provider lookups go against the live entity index; everything the
//! action declares (missing dependencies, provisions, output files) is
//! staged locally and only reaches the driver core inside the
//! [`CompletionReport`] once the run is over. Staged state is therefore
//! trivially discarded on rollback.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dashboard::Task;
use crate::driver::entities::EntityReader;
use crate::errors::{ForageError, Result};
use crate::fs::FileHandle;
use crate::types::{ActionOutcome, EntityId};

/// A file and the entities it satisfies, staged by a running action.
#[derive(Debug, Clone)]
pub struct Provision {
    pub file: FileHandle,
    pub entities: Vec<EntityId>,
}

/// Everything a finished run hands back for finalization.
#[derive(Debug)]
pub struct CompletionReport {
    pub outcome: ActionOutcome,
    /// Entity ids the action looked up and did not find, with the human
    /// titles it supplied. Non-empty ⇒ the action rolls back.
    pub missing: HashMap<EntityId, String>,
    pub provisions: Vec<Provision>,
    pub outputs: Vec<FileHandle>,
}

pub struct BuildContext {
    entities: EntityReader,
    task: Arc<dyn Task>,
    tmpdir: FileHandle,
    missing: HashMap<EntityId, String>,
    provisions: Vec<Provision>,
    outputs: Vec<FileHandle>,
    reported: Option<ActionOutcome>,
}

impl BuildContext {
    pub(crate) fn new(entities: EntityReader, task: Arc<dyn Task>, tmpdir: FileHandle) -> Self {
        Self {
            entities,
            task,
            tmpdir,
            missing: HashMap::new(),
            provisions: Vec::new(),
            outputs: Vec::new(),
            reported: None,
        }
    }

    /// Every operation is rejected once an outcome has been reported.
    fn ensure_running(&self) -> Result<()> {
        if self.reported.is_some() {
            return Err(ForageError::ActionNotRunning);
        }
        Ok(())
    }

    /// Look up the provider of `id`. A miss is recorded as a missing
    /// dependency under `title` and will roll this action back.
    pub fn find_provider(&mut self, id: &EntityId, title: &str) -> Result<Option<FileHandle>> {
        self.ensure_running()?;
        let found = self.entities.lookup(id);
        if found.is_none() {
            self.missing.insert(id.clone(), title.to_string());
        }
        Ok(found)
    }

    /// Look up the provider of `id` without recording a miss.
    pub fn find_optional_provider(&mut self, id: &EntityId) -> Result<Option<FileHandle>> {
        self.ensure_running()?;
        Ok(self.entities.lookup(id))
    }

    /// Stage a provision: `file` satisfies `entities`. Not visible to other
    /// actions until this action commits.
    pub fn provide(&mut self, file: &FileHandle, entities: Vec<EntityId>) -> Result<()> {
        self.ensure_running()?;
        self.provisions.push(Provision {
            file: file.clone(),
            entities,
        });
        Ok(())
    }

    /// Append text to the dashboard task's output stream.
    pub fn log(&self, text: &str) -> Result<()> {
        self.ensure_running()?;
        self.task.add_output(text);
        Ok(())
    }

    /// Handle for a new output file under the action's temporary directory.
    /// Output files are rescanned for further actions when this action
    /// commits, and forgotten on rollback.
    pub fn new_output(&mut self, basename: &str) -> Result<FileHandle> {
        self.ensure_running()?;
        let file = self.tmpdir.relative(basename);
        self.outputs.push(file.clone());
        Ok(file)
    }

    /// Report the action as a successful build step. Fails if any provider
    /// lookup is still unresolved: an action must not claim success while
    /// dependencies are missing.
    pub fn success(&mut self) -> Result<()> {
        self.report_commit(ActionOutcome::Succeeded)
    }

    /// Report the action as a passing test. Same contract as
    /// [`success`](Self::success).
    pub fn passed(&mut self) -> Result<()> {
        self.report_commit(ActionOutcome::Passed)
    }

    /// Report the action as failed. Always accepted while running. If
    /// dependencies are missing the action is rolled back and blocked rather
    /// than destroyed: it failed because of the gap, and becomes runnable
    /// again once the gap is filled.
    pub fn failed(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.reported = Some(ActionOutcome::Failed);
        Ok(())
    }

    fn report_commit(&mut self, outcome: ActionOutcome) -> Result<()> {
        self.ensure_running()?;
        if !self.missing.is_empty() {
            return Err(ForageError::UnresolvedDependencies);
        }
        self.reported = Some(outcome);
        Ok(())
    }

    pub(crate) fn reported(&self) -> Option<ActionOutcome> {
        self.reported
    }

    /// Append a diagnostic to the task output and, if no outcome was
    /// reported, count the run as failed. Used for uncaught errors.
    pub(crate) fn record_failure(&mut self, text: &str) {
        self.task.add_output(text);
        if self.reported.is_none() {
            self.reported = Some(ActionOutcome::Failed);
        }
    }

    pub(crate) fn into_report(self) -> CompletionReport {
        CompletionReport {
            outcome: self.reported.unwrap_or(ActionOutcome::Failed),
            missing: self.missing,
            provisions: self.provisions,
            outputs: self.outputs,
        }
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("tmpdir", &self.tmpdir)
            .field("missing", &self.missing.keys().collect::<Vec<_>>())
            .field("provisions", &self.provisions.len())
            .field("outputs", &self.outputs.len())
            .field("reported", &self.reported)
            .finish_non_exhaustive()
    }
}
