// src/driver/core.rs

//! Pure driver core.
//!
//! This is a synchronous, deterministic state machine that owns every index
//! and collection (the entity index, the blocking index, the trigger
//! registry, the action table and the pending/active/blocked sets) and
//! consumes [`DriverEvent`]s one at a time, returning the commands the async
//! shell should execute next. It holds no channels and no Tokio types, so
//! the whole scheduling semantics can be tested without a runtime.
//!
//! Each `step` runs to completion before the next event is looked at, which
//! is what makes finalization atomic: a committing action publishes its
//! provisions, unblocks every waiter, fires every trigger and rescans its
//! outputs without any other completion interleaving.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::action::{Action, ActionFactory};
use crate::dashboard::{Dashboard, TaskState};
use crate::driver::blocking::BlockingIndex;
use crate::driver::context::{BuildContext, CompletionReport, Provision};
use crate::driver::entities::{EntityIndex, EntityReader};
use crate::driver::scanner::DiscoveryScanner;
use crate::driver::state::{ActionPhase, ActionRecord};
use crate::driver::triggers::TriggerRegistry;
use crate::driver::{CoreCommand, CoreStep, DriverEvent, DriverOptions, StartOrder};
use crate::fs::FileHandle;
use crate::types::{ActionId, ActionOutcome, EntityId};

pub struct DriverCore {
    dashboard: Arc<dyn Dashboard>,
    src_root: FileHandle,
    tmp_root: FileHandle,
    options: DriverOptions,

    /// Registered factories in registration order. Names are advisory
    /// (diagnostics only).
    factories: Vec<(String, Arc<dyn ActionFactory>)>,
    triggers: TriggerRegistry,

    entities: Arc<RwLock<EntityIndex>>,
    blocking: BlockingIndex,

    actions: HashMap<ActionId, ActionRecord>,
    next_action: u64,

    /// LIFO: newly discovered actions run before older ones. Depth-first
    /// scheduling surfaces outputs that feed other actions sooner, so
    /// dependents unblock earlier.
    pending: Vec<ActionId>,
    active: HashSet<ActionId>,
    blocked: HashSet<ActionId>,
}

impl DriverCore {
    pub fn new(
        dashboard: Arc<dyn Dashboard>,
        src_root: FileHandle,
        tmp_root: FileHandle,
        options: DriverOptions,
    ) -> Self {
        Self {
            dashboard,
            src_root,
            tmp_root,
            options,
            factories: Vec::new(),
            triggers: TriggerRegistry::new(),
            entities: Arc::new(RwLock::new(EntityIndex::new())),
            blocking: BlockingIndex::new(),
            actions: HashMap::new(),
            next_action: 0,
            pending: Vec::new(),
            active: HashSet::new(),
            blocked: HashSet::new(),
        }
    }

    /// Register a factory and its trigger subscriptions. Registration is
    /// static; factories cannot be removed.
    pub fn add_factory(&mut self, name: impl Into<String>, factory: Arc<dyn ActionFactory>) {
        let name = name.into();
        self.triggers.register(&factory);
        debug!(factory = %name, "registered action factory");
        self.factories.push((name, factory));
    }

    pub fn src_root(&self) -> FileHandle {
        self.src_root.clone()
    }

    pub fn tmp_root(&self) -> FileHandle {
        self.tmp_root.clone()
    }

    /// Read-only view of the entity index (what running actions see).
    pub fn entity_reader(&self) -> EntityReader {
        EntityReader::new(Arc::clone(&self.entities))
    }

    /// Number of actions waiting for a slot (for tests).
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of actions currently dispatched (for tests).
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of actions waiting for entities (for tests).
    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    /// Nothing pending, nothing running. Blocked actions may remain; with no
    /// activity left they can never be unblocked from within.
    pub fn is_quiescent(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: DriverEvent) -> CoreStep {
        match event {
            DriverEvent::ScanRequested { src, tmp } => {
                self.scan(&src, &tmp);
            }
            DriverEvent::ActionDone { id, action, report } => {
                self.finalize(id, action, report);
            }
            DriverEvent::ActionDied { id, message } => {
                self.bury(id, &message);
            }
            DriverEvent::ShutdownRequested => {
                info!("shutdown requested");
                self.fail_blocked_actions();
                return CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                };
            }
        }

        let mut commands = Vec::new();
        let orders = self.start_some_actions();
        if !orders.is_empty() {
            commands.push(CoreCommand::StartActions(orders));
        }

        let keep_running = if self.is_quiescent() && self.options.exit_when_idle {
            info!(
                committed_entities = self.entities.read().unwrap().len(),
                still_blocked = self.blocked.len(),
                "nothing left to run"
            );
            self.fail_blocked_actions();
            false
        } else {
            true
        };

        CoreStep {
            commands,
            keep_running,
        }
    }

    /// Queue a new action made from `file`, with `tmp_location` determining
    /// the action's temporary directory (its parent, so sibling outputs land
    /// next to the mirrored file).
    pub fn queue_new_action(
        &mut self,
        action: Box<dyn Action>,
        file: &FileHandle,
        tmp_location: &FileHandle,
    ) -> ActionId {
        let task = self.dashboard.begin_task(action.verb(), &file.display_name());
        task.set_state(TaskState::Pending);

        let id = ActionId(self.next_action);
        self.next_action += 1;

        debug!(
            action = %id,
            verb = action.verb(),
            file = %file.display_name(),
            "queued new action"
        );

        self.actions.insert(
            id,
            ActionRecord {
                verb: action.verb().to_string(),
                source_name: file.display_name(),
                tmpdir: tmp_location.parent(),
                task,
                phase: ActionPhase::Pending { action },
            },
        );
        self.pending.push(id);
        id
    }

    /// Fill free slots from the tail of the pending queue.
    pub fn start_some_actions(&mut self) -> Vec<StartOrder> {
        let mut orders = Vec::new();

        while self.active.len() < self.options.max_concurrent_actions {
            let Some(id) = self.pending.pop() else { break };
            let Some(record) = self.actions.get_mut(&id) else {
                warn!(action = %id, "pending action missing from the action table");
                continue;
            };

            let phase = std::mem::replace(&mut record.phase, ActionPhase::Running);
            let action = match phase {
                ActionPhase::Pending { action } => action,
                other => {
                    warn!(action = %id, phase = other.name(), "pending queue entry was not pending");
                    record.phase = other;
                    continue;
                }
            };

            record.task.set_state(TaskState::Running);
            self.active.insert(id);

            let ctx = BuildContext::new(
                EntityReader::new(Arc::clone(&self.entities)),
                Arc::clone(&record.task),
                record.tmpdir.clone(),
            );
            debug!(action = %id, verb = %record.verb, "starting action");
            orders.push(StartOrder { id, action, ctx });
        }

        orders
    }

    /// Walk a tree and queue whatever the factories make of it.
    fn scan(&mut self, src: &FileHandle, tmp: &FileHandle) {
        let found = {
            let scanner = DiscoveryScanner::new(&self.factories);
            scanner.scan(src, tmp)
        };
        match found {
            Ok(found) => {
                for d in found {
                    self.queue_new_action(d.action, &d.src_file, &d.tmp_location);
                }
            }
            Err(err) => {
                warn!(root = %src.display_name(), error = %err, "source scan failed");
            }
        }
    }

    /// Process a completion report: roll back or commit.
    fn finalize(&mut self, id: ActionId, action: Box<dyn Action>, report: CompletionReport) {
        if !self.active.remove(&id) {
            warn!(action = %id, "completed action was not in the active set");
        }
        let Some(record) = self.actions.remove(&id) else {
            warn!(action = %id, "completed action missing from the action table");
            return;
        };

        let CompletionReport {
            outcome,
            mut missing,
            provisions,
            outputs,
        } = report;

        if !missing.is_empty() {
            // Rollback: provisions and outputs are discarded with the report.
            // An entity published while this action was running still
            // satisfies it; without this recheck the action would park on an
            // id that will never be re-published.
            {
                let index = self.entities.read().unwrap();
                missing.retain(|entity, _| !index.contains(entity));
            }

            let mut record = record;
            if missing.is_empty() {
                // Everything it lacked arrived while it was finishing: skip
                // the blocked parking and go straight back to the queue.
                debug!(action = %id, verb = %record.verb, "missing dependencies arrived mid-run; requeueing");
                record.task.set_state(TaskState::Pending);
                record.phase = ActionPhase::Pending { action };
                self.actions.insert(id, record);
                self.pending.push(id);
                return;
            }

            debug!(
                action = %id,
                verb = %record.verb,
                missing = missing.len(),
                "rolling back action with unmet dependencies"
            );
            record.task.set_state(TaskState::Blocked);
            self.blocking.block(id, missing.keys());
            record.phase = ActionPhase::Blocked { action, missing };
            self.actions.insert(id, record);
            self.blocked.insert(id);
            return;
        }

        match outcome {
            ActionOutcome::Succeeded | ActionOutcome::Passed => {
                record.task.set_state(if outcome == ActionOutcome::Passed {
                    TaskState::Passed
                } else {
                    TaskState::Done
                });
                debug!(action = %id, verb = %record.verb, provisions = provisions.len(), "action committed");
                self.commit(provisions, outputs);
            }
            ActionOutcome::Failed => {
                record.task.set_state(TaskState::Failed);
                debug!(action = %id, verb = %record.verb, "action failed");
            }
        }
        // The record (and with it the action object) is dropped here.
    }

    /// Publish a committed action's provisions, then fire triggers, then
    /// rescan its outputs.
    ///
    /// The phases are strict: every waiter across every published entity is
    /// promoted before the first trigger fires, and every trigger fires
    /// before the first output is scanned. The set of waiters is thus fixed
    /// before any new action is synthesized, which keeps the pending queue
    /// deterministic.
    fn commit(&mut self, provisions: Vec<Provision>, outputs: Vec<FileHandle>) {
        let mut published: Vec<(EntityId, FileHandle)> = Vec::new();
        {
            let mut index = self.entities.write().unwrap();
            for provision in &provisions {
                for entity in &provision.entities {
                    index.publish(entity.clone(), provision.file.clone());
                    published.push((entity.clone(), provision.file.clone()));
                }
            }
        }

        for (entity, _file) in &published {
            for waiter in self.blocking.on_entity_available(entity) {
                self.strike_missing(waiter, entity);
            }
        }

        for (entity, file) in &published {
            let factories: Vec<Arc<dyn ActionFactory>> = self.triggers.matching(entity).to_vec();
            for factory in factories {
                if let Some(action) = factory.try_make_triggered_action(entity, file) {
                    debug!(entity = %entity, file = %file.display_name(), "trigger fired");
                    // The providing file serves as both source and tmp
                    // location for triggered actions.
                    self.queue_new_action(action, file, file);
                }
            }
        }

        for output in &outputs {
            debug!(output = %output.display_name(), "rescanning committed output");
            self.scan(output, output);
        }
    }

    /// Remove `entity` from the waiter's missing set; promote it back to the
    /// pending queue when nothing is missing any more.
    fn strike_missing(&mut self, waiter: ActionId, entity: &EntityId) {
        let Some(record) = self.actions.get_mut(&waiter) else {
            warn!(action = %waiter, "blocked waiter missing from the action table");
            return;
        };

        let mut promote = false;
        if let ActionPhase::Blocked { missing, .. } = &mut record.phase {
            missing.remove(entity);
            promote = missing.is_empty();
        } else {
            warn!(action = %waiter, phase = record.phase.name(), "waiter was not blocked");
        }

        if promote {
            record.phase = match std::mem::replace(&mut record.phase, ActionPhase::Running) {
                ActionPhase::Blocked { action, .. } => ActionPhase::Pending { action },
                other => other,
            };
            self.blocked.remove(&waiter);
            self.pending.push(waiter);
            debug!(action = %waiter, verb = %record.verb, "promoted unblocked action");
        }
    }

    /// Terminal burial for an action whose task died underneath us (panic or
    /// abort): there is no report and no action object to keep.
    fn bury(&mut self, id: ActionId, message: &str) {
        self.active.remove(&id);
        if let Some(record) = self.actions.remove(&id) {
            record.task.add_output(&format!("uncaught error: {message}\n"));
            record.task.set_state(TaskState::Failed);
            warn!(action = %id, verb = %record.verb, error = %message, "action died");
        } else {
            warn!(action = %id, "dead action missing from the action table");
        }
    }

    /// Report every still-blocked action as failed, with a note naming what
    /// it was waiting for. Run at shutdown; blocked actions can never make
    /// progress once nothing else is running.
    fn fail_blocked_actions(&mut self) {
        let mut ids: Vec<ActionId> = self.blocked.drain().collect();
        ids.sort();

        for id in ids {
            let Some(record) = self.actions.remove(&id) else {
                warn!(action = %id, "blocked action missing from the action table");
                continue;
            };
            if let ActionPhase::Blocked { missing, .. } = &record.phase {
                let mut titles: Vec<&str> = missing.values().map(String::as_str).collect();
                titles.sort();
                warn!(
                    action = %id,
                    verb = %record.verb,
                    file = %record.source_name,
                    waiting_for = ?titles,
                    "action still blocked at shutdown"
                );
                record
                    .task
                    .add_output(&format!("still waiting for: {}\n", titles.join(", ")));
            }
            record.task.set_state(TaskState::Failed);
        }
    }
}

impl std::fmt::Debug for DriverCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCore")
            .field("pending", &self.pending.len())
            .field("active", &self.active.len())
            .field("blocked", &self.blocked.len())
            .field("actions", &self.actions.len())
            .finish_non_exhaustive()
    }
}
