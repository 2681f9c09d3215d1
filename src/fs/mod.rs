// src/fs/mod.rs

//! Filesystem abstraction used by the driver.
//!
//! The driver never touches `std::fs` directly: it goes through the
//! [`FileSystem`] trait so that tests can run against the in-memory
//! [`mock::MockFileSystem`]. On top of the trait sits [`FileHandle`], the
//! handle type the rest of the crate (and actions) deal in: a path bound to
//! a filesystem, cheap to clone.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + fmt::Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents)
            .with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

/// Handle to a node in the source tree or in an action's temporary tree.
///
/// Clones are independent handles to the same path through the same
/// filesystem. Handles may refer to paths that do not exist yet (e.g. output
/// files an action has only declared).
#[derive(Clone)]
pub struct FileHandle {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl FileHandle {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, or the empty string for a bare root.
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Human-readable name used for dashboard tasks and diagnostics.
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn exists(&self) -> bool {
        self.fs.exists(&self.path)
    }

    pub fn is_directory(&self) -> bool {
        self.fs.is_dir(&self.path)
    }

    /// Handle to the named child of this node.
    pub fn relative(&self, basename: &str) -> FileHandle {
        FileHandle {
            fs: Arc::clone(&self.fs),
            path: self.path.join(basename),
        }
    }

    /// Handle to the directory containing this node. The root is its own
    /// parent.
    pub fn parent(&self) -> FileHandle {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => FileHandle {
                fs: Arc::clone(&self.fs),
                path: parent.to_path_buf(),
            },
            _ => self.clone(),
        }
    }

    pub fn create_directory(&self) -> Result<()> {
        self.fs.create_dir_all(&self.path)
    }

    /// Handles to the entries of this directory.
    pub fn list_children(&self) -> Result<Vec<FileHandle>> {
        let mut children = Vec::new();
        for path in self.fs.read_dir(&self.path)? {
            children.push(FileHandle {
                fs: Arc::clone(&self.fs),
                path,
            });
        }
        Ok(children)
    }

    pub fn read_to_string(&self) -> Result<String> {
        self.fs.read_to_string(&self.path)
    }

    pub fn write(&self, contents: &[u8]) -> Result<()> {
        self.fs.write(&self.path, contents)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileHandle").field(&self.path).finish()
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileHandle {}
