// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recursive directory walking and primitive file operations.
//!
//! Walks are expressed as iterators yielding `(is_directory, path)` pairs
//! rather than recursive callbacks, with pruning handled by a predicate
//! supplied by the caller. This keeps traversal state off the call stack
//! and lets callers `take_while`/`filter`/collect like any other iterator.

use {
    crate::error::BundleFsError,
    std::path::{Path, PathBuf},
};

/// An entry yielded while walking a directory tree.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub is_dir: bool,
    pub path: PathBuf,
}

/// Walk `root` recursively, in deterministic (sorted) order.
///
/// `prune` is consulted for every directory encountered (including `root`
/// itself is never pruned); if it returns `true` that directory's
/// descendants are not visited. This is how the root bundle walker skips
/// an `__MACOSX` sibling without tracking state across calls.
pub fn walk(
    root: impl AsRef<Path>,
    prune: impl Fn(&Path) -> bool + 'static,
) -> impl Iterator<Item = Result<WalkEntry, BundleFsError>> {
    walkdir::WalkDir::new(root.as_ref())
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(move |entry| !entry.file_type().is_dir() || !prune(entry.path()))
        .map(|entry| {
            let entry = entry?;
            Ok(WalkEntry {
                is_dir: entry.file_type().is_dir(),
                path: entry.path().to_path_buf(),
            })
        })
}

/// Walk `root` with no pruning.
pub fn walk_all(root: impl AsRef<Path>) -> impl Iterator<Item = Result<WalkEntry, BundleFsError>> {
    walk(root, |_| false)
}

/// Whether `path`'s final component ends with `suffix` (e.g. `.app`).
///
/// This is a filename suffix test, not a full-path string suffix test:
/// `/a/b.app/c` does not match suffix `.app`.
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(suffix))
        .unwrap_or(false)
}

fn io_err(path: &Path, source: std::io::Error) -> BundleFsError {
    BundleFsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a file's full contents.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, BundleFsError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| io_err(path, e))
}

/// Write `data` to `path`, creating parent directories as needed.
pub fn write_file(path: impl AsRef<Path>, data: impl AsRef<[u8]>) -> Result<(), BundleFsError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(path, data).map_err(|e| io_err(path, e))
}

/// Copy `src` to `dest`, creating `dest`'s parent directories as needed.
pub fn copy_file(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<(), BundleFsError> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::copy(src, dest)
        .map(|_| ())
        .map_err(|e| io_err(src, e))
}

/// Remove a file if it exists. Not an error if it is already absent.
pub fn remove_file_if_exists(path: impl AsRef<Path>) -> Result<bool, BundleFsError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Ok(false);
    }
    std::fs::remove_file(path).map_err(|e| io_err(path, e))?;
    Ok(true)
}

pub fn create_dir_all(path: impl AsRef<Path>) -> Result<(), BundleFsError> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(|e| io_err(path, e))
}
