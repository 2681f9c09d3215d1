// src/engine/spawner.rs

//! Pluggable action spawner abstraction.
//!
//! The runtime hands `StartOrder`s to an `ActionSpawner` instead of spawning
//! Tokio tasks itself. This keeps the run loop testable: tests can substitute
//! a spawner that runs actions inline or fabricates completion reports, while
//! production uses [`TokioSpawner`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error};

use crate::driver::{DriverEvent, StartOrder};
use crate::errors::Result;
use crate::types::ActionId;

/// Trait abstracting how dispatched actions are executed.
pub trait ActionSpawner: Send {
    /// Run the given actions. Each action must eventually produce an
    /// `ActionDone` (or `ActionDied`) event on the driver channel.
    fn spawn_actions(
        &mut self,
        orders: Vec<StartOrder>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Abort everything still in flight (shutdown path).
    fn cancel_all(&mut self);
}

/// Spawner used in production: every action runs on its own Tokio task, so
/// actions overlap freely up to the core's concurrency cap.
pub struct TokioSpawner {
    event_tx: mpsc::Sender<DriverEvent>,
    running: HashMap<ActionId, AbortHandle>,
}

impl TokioSpawner {
    pub fn new(event_tx: mpsc::Sender<DriverEvent>) -> Self {
        Self {
            event_tx,
            running: HashMap::new(),
        }
    }
}

impl ActionSpawner for TokioSpawner {
    fn spawn_actions(
        &mut self,
        orders: Vec<StartOrder>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.running.retain(|_, handle| !handle.is_finished());

            for order in orders {
                let id = order.id;
                let tx = self.event_tx.clone();

                let StartOrder {
                    id: _,
                    mut action,
                    mut ctx,
                } = order;

                // The action body runs on its own task so that a panic inside
                // the action is contained and reported instead of hanging the
                // driver.
                let worker = tokio::spawn(async move {
                    let result = action.start(&mut ctx).await;
                    (action, ctx, result)
                });
                self.running.insert(id, worker.abort_handle());

                tokio::spawn(async move {
                    let event = match worker.await {
                        Ok((action, mut ctx, result)) => {
                            match result {
                                Err(err) => {
                                    ctx.record_failure(&format!("uncaught error: {err}\n"));
                                }
                                Ok(()) if ctx.reported().is_none() => {
                                    ctx.record_failure(
                                        "action returned without reporting an outcome\n",
                                    );
                                }
                                Ok(()) => {}
                            }
                            DriverEvent::ActionDone {
                                id,
                                action,
                                report: ctx.into_report(),
                            }
                        }
                        Err(join_err) => {
                            if join_err.is_cancelled() {
                                debug!(action = %id, "action task cancelled");
                            } else {
                                error!(action = %id, error = %join_err, "action task died");
                            }
                            DriverEvent::ActionDied {
                                id,
                                message: join_err.to_string(),
                            }
                        }
                    };
                    if tx.send(event).await.is_err() {
                        debug!(action = %id, "driver loop gone before completion could be delivered");
                    }
                });
            }

            Ok(())
        })
    }

    fn cancel_all(&mut self) {
        for (id, handle) in self.running.drain() {
            if !handle.is_finished() {
                debug!(action = %id, "aborting running action");
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("running", &self.running.len())
            .finish_non_exhaustive()
    }
}
