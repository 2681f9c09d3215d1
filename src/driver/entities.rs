// src/driver/entities.rs

//! Entity provision index.
//!
//! Maps entity ids to the file that currently provides them. Only committed
//! provisions land here; a blocked or failed action leaves no trace. Entries
//! are never removed during a run; a later publish for the same id simply
//! replaces the provider.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::fs::FileHandle;
use crate::types::EntityId;

#[derive(Debug, Default)]
pub struct EntityIndex {
    providers: HashMap<EntityId, FileHandle>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the provider for `id`. Last writer wins.
    pub fn publish(&mut self, id: EntityId, file: FileHandle) {
        if let Some(previous) = self.providers.get(&id) {
            if previous != &file {
                debug!(
                    entity = %id,
                    old = %previous.display_name(),
                    new = %file.display_name(),
                    "entity provider replaced"
                );
            }
        }
        self.providers.insert(id, file);
    }

    pub fn lookup(&self, id: &EntityId) -> Option<FileHandle> {
        self.providers.get(id).cloned()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.providers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Read-only view of the entity index, handed to running actions.
///
/// The driver core is the only writer; actions only ever look providers up.
#[derive(Debug, Clone)]
pub struct EntityReader {
    inner: Arc<RwLock<EntityIndex>>,
}

impl EntityReader {
    pub(crate) fn new(inner: Arc<RwLock<EntityIndex>>) -> Self {
        Self { inner }
    }

    pub fn lookup(&self, id: &EntityId) -> Option<FileHandle> {
        self.inner.read().unwrap().lookup(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.inner.read().unwrap().contains(id)
    }
}
