// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bundle discovery: the directory-suffix rules that make a directory a
//! signable unit, and the `Info.plist`-backed accessors signing code needs.

use {
    crate::{error::BundleFsError, walk},
    std::path::{Path, PathBuf},
};

/// The kinds of directory that are signable units under this spec.
///
/// Unlike a general-purpose Apple bundle reader, there is no `.framework`
/// "shallow vs non-shallow" (`Contents/`) distinction to make here: every
/// bundle kind we sign is a flat iOS-style directory containing `Info.plist`
/// and its executable side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    App,
    Appex,
    Framework,
    Xctest,
}

impl BundleKind {
    const SUFFIXES: [(&'static str, BundleKind); 4] = [
        (".app", BundleKind::App),
        (".appex", BundleKind::Appex),
        (".framework", BundleKind::Framework),
        (".xctest", BundleKind::Xctest),
    ];

    /// The bundle kind implied by a directory name, if any.
    pub fn of_path(path: &Path) -> Option<Self> {
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| walk::has_suffix(path, suffix))
            .map(|(_, kind)| *kind)
    }

    /// Whether this kind can be the root of a signing tree.
    pub fn is_root_candidate(self) -> bool {
        matches!(self, BundleKind::App | BundleKind::Appex)
    }
}

/// A directory on disk holding an `Info.plist` and (usually) an executable.
pub struct Bundle {
    root: PathBuf,
    info_plist: plist::Dictionary,
}

impl Bundle {
    /// Open the bundle rooted at `root`, parsing its `Info.plist`.
    pub fn new_from_path(root: impl Into<PathBuf>) -> Result<Self, BundleFsError> {
        let root = root.into();

        if !root.is_dir() {
            return Err(BundleFsError::NotADirectory(root));
        }

        let info_plist_path = root.join("Info.plist");
        if !info_plist_path.is_file() {
            return Err(BundleFsError::NoInfoPlist(root));
        }

        let data = walk::read_file(&info_plist_path)?;
        let value = plist::Value::from_reader_xml(std::io::Cursor::new(data)).map_err(|e| {
            BundleFsError::PlistParse {
                path: info_plist_path.clone(),
                source: e,
            }
        })?;

        let info_plist = value
            .into_dictionary()
            .ok_or(BundleFsError::InfoPlistNotADictionary(info_plist_path))?;

        Ok(Self { root, info_plist })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn info_plist_path(&self) -> PathBuf {
        self.root.join("Info.plist")
    }

    pub fn info_plist(&self) -> &plist::Dictionary {
        &self.info_plist
    }

    fn string_key(&self, key: &str) -> Option<String> {
        self.info_plist.get(key)?.as_string().map(str::to_string)
    }

    pub fn bundle_identifier(&self) -> Option<String> {
        self.string_key("CFBundleIdentifier")
    }

    pub fn bundle_version(&self) -> Option<String> {
        self.string_key("CFBundleVersion")
    }

    pub fn bundle_executable(&self) -> Option<String> {
        self.string_key("CFBundleExecutable")
    }

    pub fn display_name(&self) -> Option<String> {
        self.string_key("CFBundleDisplayName")
            .or_else(|| self.string_key("CFBundleName"))
    }
}

/// Find the root bundle directory starting from `start_dir`.
///
/// `start_dir` may already be the `.app`/`.appex`, or a directory containing
/// one (e.g. the extracted root of an `.ipa`). A top-level `__MACOSX` sibling
/// is pruned, as it is a zip-extraction artifact and never a bundle.
pub fn find_root(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let start_dir = start_dir.as_ref();

    if let Some(kind) = BundleKind::of_path(start_dir) {
        if kind.is_root_candidate() {
            return Some(start_dir.to_path_buf());
        }
    }

    walk::walk(start_dir.to_path_buf(), |path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n == "__MACOSX")
            .unwrap_or(false)
    })
    .filter_map(|entry| entry.ok())
    .find(|entry| {
        entry.is_dir
            && BundleKind::of_path(&entry.path)
                .map(BundleKind::is_root_candidate)
                .unwrap_or(false)
    })
    .map(|entry| entry.path)
}

/// Find every signable bundle directory under `root` (including bundles
/// nested arbitrarily deep inside other bundles), sorted by descending path
/// depth (deepest first). `root` itself is not included.
pub fn find_nested_bundles(root: impl AsRef<Path>) -> Vec<PathBuf> {
    let root = root.as_ref();

    let mut found: Vec<PathBuf> = walk::walk_all(root)
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.is_dir && entry.path != root)
        .filter(|entry| BundleKind::of_path(&entry.path).is_some())
        .map(|entry| entry.path)
        .collect();

    found.sort_by(|a, b| depth(b, root).cmp(&depth(a, root)));
    found
}

fn depth(path: &Path, root: &Path) -> usize {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .count()
}
