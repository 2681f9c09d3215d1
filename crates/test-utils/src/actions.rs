//! Scripted actions and factories for driver tests.
//!
//! Real actions run compilers; test actions run a list of [`Step`]s against
//! their `BuildContext`. Scripts are plain data, so factories can stamp out
//! fresh copies per file and actions stay re-runnable after a rollback.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forage::{Action, ActionFactory, BuildContext, EntityId, FileHandle, Result};

/// One step of a scripted test action.
#[derive(Debug, Clone)]
pub enum Step {
    Log(String),
    /// `find_provider`; a miss is remembered for [`Step::FailIfMissing`].
    Find { entity: String, title: String },
    FindOptional { entity: String },
    /// `failed()` and stop if any earlier `Find` missed.
    FailIfMissing,
    NewOutput { basename: String },
    /// Provide the n-th output created so far.
    ProvideOutput { index: usize, entities: Vec<String> },
    /// Provide the file this action was made from.
    ProvideSelf { entities: Vec<String> },
    SleepMillis(u64),
    /// Park on a future that never completes (aborted at shutdown).
    WaitForever,
    Succeed,
    Pass,
    Fail,
}

impl Step {
    pub fn find(entity: &str, title: &str) -> Self {
        Step::Find {
            entity: entity.to_string(),
            title: title.to_string(),
        }
    }

    pub fn new_output(basename: &str) -> Self {
        Step::NewOutput {
            basename: basename.to_string(),
        }
    }

    pub fn provide_output(index: usize, entities: &[&str]) -> Self {
        Step::ProvideOutput {
            index,
            entities: entities.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn provide_self(entities: &[&str]) -> Self {
        Step::ProvideSelf {
            entities: entities.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// An action that replays a fixed script.
pub struct ScriptedAction {
    verb: String,
    subject: Option<FileHandle>,
    steps: Vec<Step>,
}

impl ScriptedAction {
    pub fn new(verb: &str, steps: Vec<Step>) -> Self {
        Self {
            verb: verb.to_string(),
            subject: None,
            steps,
        }
    }

    /// Attach the file this action nominally works on (used by
    /// [`Step::ProvideSelf`]).
    pub fn with_subject(mut self, file: FileHandle) -> Self {
        self.subject = Some(file);
        self
    }

    pub fn boxed(verb: &str, steps: Vec<Step>) -> Box<dyn Action> {
        Box::new(Self::new(verb, steps))
    }
}

impl Action for ScriptedAction {
    fn verb(&self) -> &str {
        &self.verb
    }

    fn start<'a>(
        &'a mut self,
        ctx: &'a mut BuildContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut outputs: Vec<FileHandle> = Vec::new();
            let mut saw_missing = false;

            for step in &self.steps {
                match step {
                    Step::Log(text) => ctx.log(text)?,
                    Step::Find { entity, title } => {
                        let found = ctx.find_provider(&EntityId::new(entity.as_str()), title)?;
                        if found.is_none() {
                            saw_missing = true;
                        }
                    }
                    Step::FindOptional { entity } => {
                        let _ = ctx.find_optional_provider(&EntityId::new(entity.as_str()))?;
                    }
                    Step::FailIfMissing => {
                        if saw_missing {
                            ctx.failed()?;
                            return Ok(());
                        }
                    }
                    Step::NewOutput { basename } => {
                        outputs.push(ctx.new_output(basename)?);
                    }
                    Step::ProvideOutput { index, entities } => {
                        let file = outputs
                            .get(*index)
                            .cloned()
                            .expect("scripted action has no such output");
                        let ids = entities.iter().map(|e| EntityId::new(e.as_str())).collect();
                        ctx.provide(&file, ids)?;
                    }
                    Step::ProvideSelf { entities } => {
                        let file = self
                            .subject
                            .clone()
                            .expect("scripted action has no subject file");
                        let ids = entities.iter().map(|e| EntityId::new(e.as_str())).collect();
                        ctx.provide(&file, ids)?;
                    }
                    Step::SleepMillis(ms) => {
                        tokio::time::sleep(Duration::from_millis(*ms)).await;
                    }
                    Step::WaitForever => {
                        std::future::pending::<()>().await;
                    }
                    Step::Succeed => {
                        ctx.success()?;
                        return Ok(());
                    }
                    Step::Pass => {
                        ctx.passed()?;
                        return Ok(());
                    }
                    Step::Fail => {
                        ctx.failed()?;
                        return Ok(());
                    }
                }
            }

            Ok(())
        })
    }
}

/// Factory that reacts to basename suffixes with scripted actions, recording
/// every invocation so tests can assert on them.
pub struct ScriptedFactory {
    verb: String,
    suffix: String,
    steps: Vec<Step>,
    triggers: Vec<EntityId>,
    triggered_steps: Vec<Step>,
    invocations: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFactory {
    /// A factory making `steps` actions for every file whose basename ends
    /// with `suffix`.
    pub fn new(verb: &str, suffix: &str, steps: Vec<Step>) -> Self {
        Self {
            verb: verb.to_string(),
            suffix: suffix.to_string(),
            steps,
            triggers: Vec::new(),
            triggered_steps: Vec::new(),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Subscribe to `entity`; publications synthesize a `steps` action
    /// against the providing file.
    pub fn with_trigger(mut self, entity: &str, steps: Vec<Step>) -> Self {
        self.triggers.push(EntityId::new(entity));
        self.triggered_steps = steps;
        self
    }

    /// Every `try_make_action`/`try_make_triggered_action` call that produced
    /// (or was offered the chance to produce) an action.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }
}

impl ActionFactory for ScriptedFactory {
    fn try_make_action(&self, file: &FileHandle) -> Option<Box<dyn Action>> {
        if !file.basename().ends_with(&self.suffix) {
            return None;
        }
        self.invocations
            .lock()
            .unwrap()
            .push(format!("scan:{}", file.display_name()));
        Some(Box::new(
            ScriptedAction::new(&self.verb, self.steps.clone()).with_subject(file.clone()),
        ))
    }

    fn trigger_entities(&self) -> Vec<EntityId> {
        self.triggers.clone()
    }

    fn try_make_triggered_action(
        &self,
        id: &EntityId,
        file: &FileHandle,
    ) -> Option<Box<dyn Action>> {
        self.invocations
            .lock()
            .unwrap()
            .push(format!("trigger:{}@{}", id, file.display_name()));
        if self.triggered_steps.is_empty() {
            return None;
        }
        Some(Box::new(
            ScriptedAction::new(&self.verb, self.triggered_steps.clone())
                .with_subject(file.clone()),
        ))
    }
}
