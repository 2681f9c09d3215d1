// src/driver/mod.rs

//! The discovery build driver.
//!
//! The driver does not consume a hand-written dependency graph. It walks the
//! source tree, asks every registered [`ActionFactory`](crate::action::ActionFactory)
//! to make actions from the files it finds, and speculatively runs them.
//! While running, an action declares through its [`BuildContext`] which
//! entities it consumes and produces. An action that needed an entity nobody
//! has provided yet is rolled back and parked until some other action
//! provides it; a committing action wakes its waiters, fires factory
//! triggers, and has its output files rescanned for yet more actions.
//!
//! The semantics live in the pure [`DriverCore`]; the async shell around it
//! is in [`crate::engine`]. [`Driver`] wires the two together.

pub mod blocking;
pub mod context;
pub mod core;
pub mod entities;
pub mod scanner;
pub mod state;
pub mod triggers;

pub use blocking::BlockingIndex;
pub use context::{BuildContext, CompletionReport, Provision};
pub use self::core::DriverCore;
pub use entities::{EntityIndex, EntityReader};
pub use scanner::{DiscoveredAction, DiscoveryScanner};
pub use state::{ActionPhase, ActionRecord};
pub use triggers::TriggerRegistry;

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::action::{Action, ActionFactory};
use crate::config::DriverConfig;
use crate::dashboard::Dashboard;
use crate::engine::{Runtime, TokioSpawner};
use crate::errors::Result;
use crate::fs::{FileHandle, FileSystem, RealFileSystem};
use crate::types::ActionId;

/// Capacity of the driver event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Options governing the driver run loop.
#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    /// Upper bound on concurrently running actions. Must be at least 1.
    pub max_concurrent_actions: usize,
    /// Exit the run loop once nothing is pending or running. Actions still
    /// blocked at that point are reported as failed. With this off the loop
    /// stays alive for injected events (e.g. rescans from a file watcher).
    pub exit_when_idle: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            max_concurrent_actions: 4,
            exit_when_idle: true,
        }
    }
}

/// Events flowing into the driver core from spawned actions and embedders.
pub enum DriverEvent {
    /// A running action finished its run and handed back its report.
    ActionDone {
        id: ActionId,
        /// The action object, returned so it can run again after a rollback.
        action: Box<dyn Action>,
        report: CompletionReport,
    },
    /// A running action's task panicked or was aborted; there is no report.
    ActionDied { id: ActionId, message: String },
    /// Walk a source tree and queue whatever the factories make of it.
    ScanRequested { src: FileHandle, tmp: FileHandle },
    /// Graceful shutdown: report blocked actions, abort active ones.
    ShutdownRequested,
}

impl fmt::Debug for DriverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverEvent::ActionDone { id, report, .. } => f
                .debug_struct("ActionDone")
                .field("id", id)
                .field("outcome", &report.outcome)
                .field("missing", &report.missing.len())
                .field("provisions", &report.provisions.len())
                .field("outputs", &report.outputs.len())
                .finish(),
            DriverEvent::ActionDied { id, message } => f
                .debug_struct("ActionDied")
                .field("id", id)
                .field("message", message)
                .finish(),
            DriverEvent::ScanRequested { src, .. } => f
                .debug_struct("ScanRequested")
                .field("src", &src.display_name())
                .finish(),
            DriverEvent::ShutdownRequested => f.write_str("ShutdownRequested"),
        }
    }
}

/// One action ready to run, with everything the spawner needs.
pub struct StartOrder {
    pub id: ActionId,
    pub action: Box<dyn Action>,
    pub ctx: BuildContext,
}

impl fmt::Debug for StartOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartOrder")
            .field("id", &self.id)
            .field("verb", &self.action.verb())
            .finish_non_exhaustive()
    }
}

/// Command produced by the core, executed by the IO shell.
#[derive(Debug)]
pub enum CoreCommand {
    /// Hand these actions to the spawner.
    StartActions(Vec<StartOrder>),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer event loop should keep running.
    pub keep_running: bool,
}

/// High-level entry point: a core plus its event channel, ready to run.
pub struct Driver {
    core: DriverCore,
    event_tx: mpsc::Sender<DriverEvent>,
    event_rx: mpsc::Receiver<DriverEvent>,
}

impl Driver {
    pub fn new(
        dashboard: Arc<dyn Dashboard>,
        src_root: FileHandle,
        tmp_root: FileHandle,
        options: DriverOptions,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            core: DriverCore::new(dashboard, src_root, tmp_root, options),
            event_tx,
            event_rx,
        }
    }

    /// Construct against the real filesystem from a validated config.
    pub fn from_config(config: &DriverConfig, dashboard: Arc<dyn Dashboard>) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Self::new(
            dashboard,
            FileHandle::new(Arc::clone(&fs), &config.src),
            FileHandle::new(fs, &config.tmp),
            config.options,
        )
    }

    /// Register a factory under an advisory name.
    pub fn add_factory(&mut self, name: impl Into<String>, factory: Arc<dyn ActionFactory>) {
        self.core.add_factory(name, factory);
    }

    /// Sender for injecting events from outside the loop (rescans after file
    /// changes, shutdown on Ctrl-C).
    pub fn event_sender(&self) -> mpsc::Sender<DriverEvent> {
        self.event_tx.clone()
    }

    /// Run the driver: scan the source root, then process events until
    /// quiescence or shutdown.
    pub async fn run(self) -> Result<()> {
        let Driver {
            core,
            event_tx,
            event_rx,
        } = self;

        // Seed the initial discovery scan; everything else follows from it.
        event_tx
            .send(DriverEvent::ScanRequested {
                src: core.src_root(),
                tmp: core.tmp_root(),
            })
            .await
            .map_err(|_| anyhow::anyhow!("driver event channel closed before startup"))?;

        let spawner = TokioSpawner::new(event_tx);
        let runtime = Runtime::new(core, event_rx, spawner);
        runtime.run().await
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}
