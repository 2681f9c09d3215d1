// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::driver::{CoreCommand, DriverCore, DriverEvent};
use crate::engine::ActionSpawner;
use crate::errors::Result;

/// Drives the pure core in response to `DriverEvent`s and delegates action
/// execution to an `ActionSpawner`.
///
/// This is a pure IO shell around `DriverCore`, which contains all the
/// scheduling semantics. This struct handles async IO: reading events from
/// the channel and dispatching ready actions to the spawner.
pub struct Runtime<S: ActionSpawner> {
    core: DriverCore,
    event_rx: mpsc::Receiver<DriverEvent>,
    spawner: S,
}

impl<S: ActionSpawner> fmt::Debug for Runtime<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<S: ActionSpawner> Runtime<S> {
    pub fn new(core: DriverCore, event_rx: mpsc::Receiver<DriverEvent>, spawner: S) -> Self {
        Self {
            core,
            event_rx,
            spawner,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `DriverEvent`s from `event_rx`.
    /// - Feeds them into the core.
    /// - Executes the commands returned by the core (dispatch actions).
    /// - Stops when the core is done; anything still in flight is aborted.
    pub async fn run(mut self) -> Result<()> {
        info!("forage driver started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("driver event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "driver received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping driver");
                break;
            }
        }

        self.spawner.cancel_all();
        info!("driver exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartActions(orders) => {
                if orders.is_empty() {
                    return Ok(());
                }
                debug!(count = orders.len(), "dispatching actions to spawner");
                self.spawner.spawn_actions(orders).await
            }
        }
    }
}
