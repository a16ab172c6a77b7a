//! File tree assertions

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every regular file under `root`, keyed by path relative to `root`
pub fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    if !root.exists() {
        return BTreeMap::new();
    }
    WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            let contents = std::fs::read(entry.path()).unwrap();
            (relative, contents)
        })
        .collect()
}

/// Relative paths of every file under `root`
pub fn tree_paths(root: &Path) -> Vec<PathBuf> {
    snapshot_tree(root).into_keys().collect()
}

/// Assert a file exists with exactly these contents
pub fn assert_file(path: &Path, expected: &[u8]) {
    let actual = std::fs::read(path)
        .unwrap_or_else(|e| panic!("expected {} to exist: {e}", path.display()));
    assert_eq!(
        actual.len(),
        expected.len(),
        "size mismatch for {}",
        path.display()
    );
    assert!(actual == expected, "content mismatch for {}", path.display());
}
