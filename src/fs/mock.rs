// src/fs/mock.rs

//! In-memory filesystem for tests.
//!
//! Entries live in a sorted map keyed by path, so directory listings come
//! back in name order and discovery scans over a mock tree are fully
//! deterministic.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::FileSystem;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, creating every ancestor directory.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        let mut nodes = self.nodes.lock().unwrap();
        add_ancestors(&mut nodes, &path);
        nodes.insert(path, Node::File(content.into()));
    }

    /// Insert an (empty) directory, creating every ancestor.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut nodes = self.nodes.lock().unwrap();
        add_ancestors(&mut nodes, &path);
        nodes.insert(path, Node::Dir);
    }
}

fn normalize(path: &Path) -> PathBuf {
    // Strip leading "./" so lookups are insensitive to how the path was
    // spelled.
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn add_ancestors(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    let mut ancestor = PathBuf::new();
    for component in path.components() {
        ancestor.push(component);
        if ancestor.as_path() != path {
            nodes.entry(ancestor.clone()).or_insert(Node::Dir);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(&normalize(path)) {
            Some(Node::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(Node::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let nodes = self.nodes.lock().unwrap();
        nodes.contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let nodes = self.nodes.lock().unwrap();
        matches!(nodes.get(&normalize(path)), Some(Node::Dir))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.lock().unwrap();
        if matches!(nodes.get(&path), Some(Node::File(_))) {
            return Err(anyhow!("Not a directory: {:?}", path));
        }
        add_ancestors(&mut nodes, &path);
        nodes.insert(path, Node::Dir);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let path = normalize(path);
        let nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(&path), Some(Node::Dir)) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        // Direct children only: range over the sorted keys under `path`.
        let children = nodes
            .keys()
            .filter(|p| p.parent() == Some(path.as_path()))
            .cloned()
            .collect();
        Ok(children)
    }
}
