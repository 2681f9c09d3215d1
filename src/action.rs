// src/action.rs

//! Action and factory traits.
//!
//! Actions are the opaque units of work the driver schedules. The driver
//! never inspects what an action does; it only observes the verb (for the
//! dashboard) and whatever the action declares through its [`BuildContext`]
//! while running: provider lookups, provisions, output files, and finally an
//! outcome.

use std::future::Future;
use std::pin::Pin;

use crate::driver::BuildContext;
use crate::errors::Result;
use crate::fs::FileHandle;
use crate::types::EntityId;

/// Opaque unit of build work.
pub trait Action: Send {
    /// Human-readable verb shown on the dashboard ("compile", "link", "test").
    fn verb(&self) -> &str;

    /// Run the action.
    ///
    /// The action interacts with the driver exclusively through `ctx`. It
    /// must report an outcome (`success`, `passed` or `failed`) before the
    /// returned future resolves; returning `Err` (or resolving without
    /// reporting) counts as an uncaught failure and is logged to the task.
    ///
    /// An action may be started again after a rollback, so `start` takes
    /// `&mut self` rather than consuming the action.
    fn start<'a>(
        &'a mut self,
        ctx: &'a mut BuildContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Synthesizes actions from discovered files and from trigger entities.
pub trait ActionFactory: Send + Sync {
    /// Offered every file the discovery scan encounters. Return `Some` to
    /// queue an action for it.
    fn try_make_action(&self, file: &FileHandle) -> Option<Box<dyn Action>>;

    /// Entity ids whose publication should re-offer this factory a chance to
    /// synthesize an action.
    fn trigger_entities(&self) -> Vec<EntityId> {
        Vec::new()
    }

    /// Offered the `(entity, providing file)` pair whenever one of the ids
    /// from [`trigger_entities`](Self::trigger_entities) is published.
    fn try_make_triggered_action(
        &self,
        _id: &EntityId,
        _file: &FileHandle,
    ) -> Option<Box<dyn Action>> {
        None
    }
}
