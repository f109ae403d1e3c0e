// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building and patching the `_CodeSignature/CodeResources` manifest.
//!
//! The `rules`/`rules2` sections are metadata consumed by the OS loader,
//! never by this engine; they're emitted as a literal constant table rather
//! than compiled from regular expressions.

use {
    crate::{digest, error::ResignError},
    bundle_fs::walk,
    plist::{Dictionary, Value},
    std::{collections::BTreeMap, path::Path},
};

/// The `files`/`files2` maps of a `CodeResources` manifest.
///
/// `rules`/`rules2` are not modeled as data here because they never vary:
/// every manifest this engine writes carries the same literal tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeResources {
    pub files: BTreeMap<String, Value>,
    pub files2: BTreeMap<String, Value>,
}

impl CodeResources {
    /// Build a fresh manifest for every regular file under `bundle_dir`,
    /// excluding `_CodeSignature/CodeResources` and `bundle_executable`.
    pub fn build(bundle_dir: &Path, bundle_executable: &str) -> Result<Self, ResignError> {
        let code_signature_rel = "_CodeSignature/CodeResources";

        let mut manifest = Self::default();

        let mut relpaths: Vec<String> = walk::walk_all(bundle_dir)
            .filter_map(|e| e.ok())
            .filter(|e| !e.is_dir)
            .map(|e| {
                e.path
                    .strip_prefix(bundle_dir)
                    .unwrap_or(&e.path)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .filter(|rel| rel != code_signature_rel && rel != bundle_executable)
            .collect();
        relpaths.sort();

        for relpath in relpaths {
            let abs = bundle_dir.join(&relpath);
            let (sha1, sha256) = digest::sha_pair_file_base64(&abs)?;
            manifest.insert_entry(&relpath, &sha1, &sha256);
        }

        Ok(manifest)
    }

    fn insert_entry(&mut self, relpath: &str, sha1: &str, sha256: &str) {
        let omit_from_files = relpath.ends_with(".lproj/locversion.plist");
        let is_lproj = relpath.contains(".lproj/");
        let is_files2_exempt = omit_from_files
            || relpath == "Info.plist"
            || relpath == "PkgInfo"
            || relpath.ends_with(".DS_Store");

        if !omit_from_files {
            let value = if is_lproj {
                let mut dict = Dictionary::new();
                dict.insert("hash".to_string(), Value::String(digest::data_prefixed(sha1)));
                dict.insert("optional".to_string(), Value::Boolean(true));
                Value::Dictionary(dict)
            } else {
                Value::String(digest::data_prefixed(sha1))
            };
            self.files.insert(relpath.to_string(), value);
        }

        if !is_files2_exempt {
            let mut dict = Dictionary::new();
            dict.insert("hash".to_string(), Value::String(digest::data_prefixed(sha1)));
            dict.insert("hash2".to_string(), Value::String(digest::data_prefixed(sha256)));
            if is_lproj {
                dict.insert("optional".to_string(), Value::Boolean(true));
            }
            self.files2.insert(relpath.to_string(), Value::Dictionary(dict));
        }
    }

    /// Overwrite the hash entries for `changed_relpaths` in place, leaving
    /// every other entry untouched.
    pub fn patch_changed(
        &mut self,
        bundle_dir: &Path,
        changed_relpaths: &[String],
    ) -> Result<(), ResignError> {
        for relpath in changed_relpaths {
            let abs = bundle_dir.join(relpath);
            if !abs.is_file() {
                continue;
            }
            let (sha1, sha256) = digest::sha_pair_file_base64(&abs)?;

            if let Some(existing) = self.files.get_mut(relpath) {
                match existing {
                    Value::String(s) => *s = digest::data_prefixed(&sha1),
                    Value::Dictionary(dict) => {
                        dict.insert("hash".to_string(), Value::String(digest::data_prefixed(&sha1)));
                    }
                    _ => {}
                }
            }

            if let Some(Value::Dictionary(dict)) = self.files2.get_mut(relpath) {
                dict.insert("hash".to_string(), Value::String(digest::data_prefixed(&sha1)));
                dict.insert("hash2".to_string(), Value::String(digest::data_prefixed(&sha256)));
            }
        }

        Ok(())
    }

    /// Serialize to the on-disk plist layout (`files`, `files2`, `rules`,
    /// `rules2`) as bytes, without touching the filesystem.
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>, ResignError> {
        let mut root = Dictionary::new();
        root.insert("files".to_string(), Value::Dictionary(self.files_dict()));
        root.insert("files2".to_string(), Value::Dictionary(self.files2_dict()));
        root.insert("rules".to_string(), rules_value());
        root.insert("rules2".to_string(), rules2_value());

        let mut buf = Vec::new();
        Value::Dictionary(root)
            .to_writer_xml(&mut buf)
            .map_err(|e| ResignError::plist("<in-memory CodeResources>", e))?;
        Ok(buf)
    }

    /// Serialize to the on-disk plist layout and write it to `path`.
    pub fn write(&self, path: &Path) -> Result<(), ResignError> {
        let buf = self.to_xml_bytes()?;
        walk::write_file(path, buf)?;
        Ok(())
    }

    /// Read an existing manifest back from disk, splitting `files`/`files2`
    /// out of the `rules`/`rules2` sections (which are never parsed back
    /// into anything but discarded, since they're always regenerated from
    /// the literal table on write).
    pub fn read(path: &Path) -> Result<Self, ResignError> {
        let data = walk::read_file(path)?;
        let root = Value::from_reader_xml(std::io::Cursor::new(data))
            .map_err(|e| ResignError::plist(path, e))?
            .into_dictionary()
            .ok_or_else(|| ResignError::CacheDecodeFailure(path.to_path_buf()))?;

        let files = root
            .get("files")
            .and_then(Value::as_dictionary)
            .map(|d| d.clone().into_iter().collect())
            .unwrap_or_default();

        let files2 = root
            .get("files2")
            .and_then(Value::as_dictionary)
            .map(|d| d.clone().into_iter().collect())
            .unwrap_or_default();

        Ok(Self { files, files2 })
    }

    fn files_dict(&self) -> Dictionary {
        self.files.clone().into_iter().collect()
    }

    fn files2_dict(&self) -> Dictionary {
        self.files2.clone().into_iter().collect()
    }
}

fn weighted_rule(omit: bool, optional: bool, weight: f64) -> Value {
    let mut dict = Dictionary::new();
    if omit {
        dict.insert("omit".to_string(), Value::Boolean(true));
    }
    if optional {
        dict.insert("optional".to_string(), Value::Boolean(true));
    }
    dict.insert("weight".to_string(), Value::Real(weight));
    Value::Dictionary(dict)
}

fn rules_value() -> Value {
    let mut dict = Dictionary::new();
    dict.insert("^.*".to_string(), Value::Boolean(true));
    dict.insert(r"^.*\.lproj/".to_string(), weighted_rule(false, true, 1000.0));
    dict.insert(
        r"^.*\.lproj/locversion.plist$".to_string(),
        weighted_rule(true, false, 1100.0),
    );
    dict.insert(r"^Base\.lproj/".to_string(), weighted_rule(false, false, 1010.0));
    dict.insert("^version.plist$".to_string(), Value::Boolean(true));
    Value::Dictionary(dict)
}

fn rules2_value() -> Value {
    let mut dict = Dictionary::new();
    dict.insert("^.*".to_string(), Value::Boolean(true));
    dict.insert(r".*\.dSYM($|/)".to_string(), weighted_rule(false, false, 11.0));
    dict.insert(
        r"^(.*/)?\.DS_Store$".to_string(),
        weighted_rule(true, false, 2000.0),
    );
    dict.insert(r"^.*\.lproj/".to_string(), weighted_rule(false, true, 1000.0));
    dict.insert(
        r"^.*\.lproj/locversion.plist$".to_string(),
        weighted_rule(true, false, 1100.0),
    );
    dict.insert(r"^Base\.lproj/".to_string(), weighted_rule(false, false, 1010.0));
    dict.insert(r"^Info\.plist$".to_string(), weighted_rule(true, false, 20.0));
    dict.insert(r"^PkgInfo$".to_string(), weighted_rule(true, false, 20.0));
    dict.insert(
        r"^embedded\.provisionprofile$".to_string(),
        weighted_rule(false, false, 20.0),
    );
    dict.insert(r"^version\.plist$".to_string(), weighted_rule(false, false, 20.0));
    Value::Dictionary(dict)
}
