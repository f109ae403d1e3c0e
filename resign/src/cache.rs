// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk cache of the signing plan from a prior run, keyed by the
//! absolute path of the root bundle directory.

use {
    crate::{error::ResignError, sign_plan::SignNode},
    bundle_fs::walk,
    std::path::{Path, PathBuf},
};

const CACHE_DIR: &str = ".zsign_cache";

/// Cache key for `root`: the hex SHA-1 of its absolute path.
///
/// Moving a bundle to a different path invalidates its cache; this is
/// intentional, not a bug to fix.
pub fn cache_key(root: &Path) -> Result<String, ResignError> {
    let abs = root
        .canonicalize()
        .map_err(|e| ResignError::io(root, e))?;
    let digest = ring::digest::digest(
        &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
        abs.to_string_lossy().as_bytes(),
    );
    Ok(hex::encode(digest.as_ref()))
}

fn cache_path(cache_base: &Path, key: &str) -> PathBuf {
    cache_base.join(CACHE_DIR).join(format!("{key}.json"))
}

/// Load the cached `SignNode` tree for `root`, if a cache file exists under
/// `cache_base` (the process's current directory in production; a temp
/// directory in tests).
///
/// A present-but-corrupt cache file is a recoverable [`ResignError::CacheDecodeFailure`];
/// a missing file is simply `Ok(None)`.
pub fn load(cache_base: &Path, root: &Path) -> Result<Option<SignNode>, ResignError> {
    let path = cache_path(cache_base, &cache_key(root)?);
    if !path.is_file() {
        return Ok(None);
    }

    let data = walk::read_file(&path)?;
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|_| ResignError::CacheDecodeFailure(path))
}

/// Whether a cache file exists for `root`.
pub fn exists(cache_base: &Path, root: &Path) -> Result<bool, ResignError> {
    Ok(cache_path(cache_base, &cache_key(root)?).is_file())
}

/// Persist `node` (the root of the signing plan, after a successful sign)
/// as the new cache entry for `root`.
pub fn save(cache_base: &Path, root: &Path, node: &SignNode) -> Result<(), ResignError> {
    let path = cache_path(cache_base, &cache_key(root)?);
    let data = serde_json::to_vec_pretty(node).map_err(|_| ResignError::CacheDecodeFailure(path.clone()))?;
    walk::write_file(&path, data)?;
    Ok(())
}
