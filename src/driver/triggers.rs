// src/driver/triggers.rs

//! Standing subscriptions from factories to entity publications.
//!
//! At registration each factory is asked once which entity ids it wants to
//! react to. When one of those ids is published (or re-published; there is
//! no dedupe), every subscribed factory is offered the `(id, providing file)`
//! pair and may synthesize a new action.

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::ActionFactory;
use crate::types::EntityId;

#[derive(Default)]
pub struct TriggerRegistry {
    subscriptions: HashMap<EntityId, Vec<Arc<dyn ActionFactory>>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the factory's trigger subscriptions. Registration is static:
    /// there is no removal.
    pub fn register(&mut self, factory: &Arc<dyn ActionFactory>) {
        for id in factory.trigger_entities() {
            self.subscriptions
                .entry(id)
                .or_default()
                .push(Arc::clone(factory));
        }
    }

    /// Factories subscribed to `id`, in registration order.
    pub fn matching(&self, id: &EntityId) -> &[Arc<dyn ActionFactory>] {
        self.subscriptions.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerRegistry")
            .field("entities", &self.subscriptions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
