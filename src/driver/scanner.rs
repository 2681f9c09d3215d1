// src/driver/scanner.rs

//! Source tree discovery.
//!
//! The scanner walks a source tree depth-first, mirrors its directory
//! structure under the temporary tree, and offers every file to every
//! registered factory. It does not queue anything itself: it returns the
//! actions the factories produced, paired with where they came from, and the
//! core queues them.

use std::sync::Arc;

use tracing::debug;

use crate::action::{Action, ActionFactory};
use crate::errors::Result;
use crate::fs::FileHandle;

/// An action produced by a scan, with its source file and tmp mirror.
pub struct DiscoveredAction {
    pub action: Box<dyn Action>,
    pub src_file: FileHandle,
    pub tmp_location: FileHandle,
}

pub struct DiscoveryScanner<'a> {
    factories: &'a [(String, Arc<dyn ActionFactory>)],
}

impl<'a> DiscoveryScanner<'a> {
    pub fn new(factories: &'a [(String, Arc<dyn ActionFactory>)]) -> Self {
        Self { factories }
    }

    /// Walk `src_root`, mirroring directories under `tmp_root`.
    ///
    /// The work list is LIFO, so the walk is depth-first; factory iteration
    /// per file follows registration order.
    pub fn scan(&self, src_root: &FileHandle, tmp_root: &FileHandle) -> Result<Vec<DiscoveredAction>> {
        let mut discovered = Vec::new();
        let mut work = vec![(src_root.clone(), tmp_root.clone())];

        while let Some((src, tmp)) = work.pop() {
            if src.is_directory() {
                if !tmp.is_directory() {
                    tmp.create_directory()?;
                }
                for child in src.list_children()? {
                    let mirror = tmp.relative(&child.basename());
                    work.push((child, mirror));
                }
            } else {
                for (name, factory) in self.factories {
                    if let Some(action) = factory.try_make_action(&src) {
                        debug!(
                            factory = %name,
                            file = %src.display_name(),
                            verb = action.verb(),
                            "factory produced action"
                        );
                        discovered.push(DiscoveredAction {
                            action,
                            src_file: src.clone(),
                            tmp_location: tmp.clone(),
                        });
                    }
                }
            }
        }

        Ok(discovered)
    }
}
