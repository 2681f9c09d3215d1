//! Mock source trees for driver tests.

use std::path::Path;
use std::sync::Arc;

use forage::fs::mock::MockFileSystem;
use forage::{FileHandle, FileSystem};

/// Build an in-memory tree with the given files under `src/`, returning the
/// filesystem plus handles for the source root and an (initially absent)
/// `tmp/` root.
pub fn mock_tree(files: &[(&str, &str)]) -> (Arc<MockFileSystem>, FileHandle, FileHandle) {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_dir("src");
    for (path, content) in files {
        fs.add_file(Path::new("src").join(path), content.as_bytes().to_vec());
    }

    let fs_dyn: Arc<dyn FileSystem> = Arc::<MockFileSystem>::clone(&fs);
    let src = FileHandle::new(Arc::clone(&fs_dyn), "src");
    let tmp = FileHandle::new(fs_dyn, "tmp");
    (fs, src, tmp)
}
