// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The signing plan: [`SignNode`] and the bundle enumerator (finding the
//! root, and every nested signable unit beneath it) that builds it.

use {
    crate::{digest, error::ResignError, plist_ext::DictionaryExt},
    bundle_fs::{bundle, walk},
    serde::{Deserialize, Serialize},
    std::path::Path,
};

/// One entry in the signing plan.
///
/// Only the root node carries a non-empty `files` (loose dylibs) and `name`;
/// non-root nodes are leaves with respect to `folders` too, because
/// [`enumerate`] already flattens the whole nested-bundle tree into one
/// depth-sorted list stored on the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignNode {
    /// Location relative to the root, `/` for the root itself.
    pub path: String,
    pub bundle_id: String,
    pub bundle_version: String,
    pub bundle_executable: String,
    /// Base64 SHA-1 of this node's `Info.plist`.
    pub sha1: String,
    /// Base64 SHA-256 of this node's `Info.plist`.
    pub sha256: String,
    #[serde(default)]
    pub folders: Vec<SignNode>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub changed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

/// Build the `SignNode` for a single bundle directory. `path` is that
/// bundle's location relative to the signing root (`"/"` for the root).
pub fn get_sign_folder_info(
    bundle_dir: &Path,
    path: String,
    with_name: bool,
) -> Result<SignNode, ResignError> {
    let info_plist_path = bundle_dir.join("Info.plist");
    let data = walk::read_file(&info_plist_path)?;

    let info = plist::Value::from_reader_xml(std::io::Cursor::new(&data))
        .map_err(|e| ResignError::plist(&info_plist_path, e))?
        .into_dictionary()
        .ok_or_else(|| ResignError::MissingPlistField {
            path: info_plist_path.clone(),
            field: "<root dictionary>",
        })?;

    let bundle_id = info
        .get_string("CFBundleIdentifier")
        .ok_or_else(|| ResignError::MissingPlistField {
            path: info_plist_path.clone(),
            field: "CFBundleIdentifier",
        })?
        .to_string();

    let bundle_executable = info
        .get_string("CFBundleExecutable")
        .ok_or_else(|| ResignError::MissingPlistField {
            path: info_plist_path.clone(),
            field: "CFBundleExecutable",
        })?
        .to_string();

    let bundle_version = info.get_string("CFBundleVersion").unwrap_or("").to_string();

    let name = if with_name {
        Some(
            info.get_string("CFBundleDisplayName")
                .or_else(|| info.get_string("CFBundleName"))
                .unwrap_or("")
                .to_string(),
        )
    } else {
        None
    };

    Ok(SignNode {
        path,
        bundle_id,
        bundle_version,
        bundle_executable,
        sha1: digest::sha1_base64(&data),
        sha256: digest::sha256_base64(&data),
        folders: Vec::new(),
        files: Vec::new(),
        changed: Vec::new(),
        name,
    })
}

/// Find the root `.app`/`.appex` starting from `start_dir`.
pub fn find_root(start_dir: &Path) -> Result<std::path::PathBuf, ResignError> {
    bundle::find_root(start_dir).ok_or_else(|| ResignError::NotABundle(start_dir.to_path_buf()))
}

/// Enumerate every signable unit nested under `root` (not including `root`
/// itself), sorted deepest-first. This is the authoritative signing order:
/// callers sign this list strictly in order, then the root last.
///
/// A nested bundle whose `Info.plist` is missing or malformed is skipped
/// rather than aborting the whole run; it's logged and left for the root
/// bundle's own file hashing to pick up as an ordinary resource.
pub fn enumerate(root: &Path) -> Vec<SignNode> {
    bundle::find_nested_bundles(root)
        .into_iter()
        .filter_map(|dir| {
            let relative = dir
                .strip_prefix(root)
                .unwrap_or(&dir)
                .to_string_lossy()
                .replace('\\', "/");
            match get_sign_folder_info(&dir, relative, false) {
                Ok(node) => Some(node),
                Err(e) => {
                    log::warn!("skipping nested bundle {}: {e}", dir.display());
                    None
                }
            }
        })
        .collect()
}

/// Collect every loose `.dylib` anywhere under `root`, relative to `root`.
///
/// This mirrors the scan scope of the reference implementation: it looks at
/// every file under the whole root, not just files outside nested bundles.
/// A dylib inside a child `.framework`'s own `Frameworks/` directory is
/// therefore picked up here *and* signed again when that framework is
/// signed as its own node. This is a known double-sign and is preserved
/// deliberately; see `DESIGN.md`.
pub fn collect_loose_dylibs(root: &Path) -> Result<Vec<String>, ResignError> {
    let mut dylibs: Vec<String> = walk::walk_all(root)
        .filter_map(|e| e.ok())
        .filter(|e| !e.is_dir && walk::has_suffix(&e.path, ".dylib"))
        .map(|e| {
            e.path
                .strip_prefix(root)
                .unwrap_or(&e.path)
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    dylibs.sort();
    Ok(dylibs)
}
