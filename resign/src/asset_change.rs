// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deciding whether a cached signing plan can be reused: has any icon, or
//! the compiled asset catalog, changed on disk since the cache was written?

use {
    crate::{digest, plist_ext::DictionaryExt},
    log::{info, warn},
    plist::{Dictionary, Value},
    std::{collections::BTreeMap, path::Path},
};

/// Conventional icon filenames checked even when absent from `Info.plist`.
const CONVENTIONAL_ICON_NAMES: &[&str] = &[
    "Icon.png",
    "Icon@2x.png",
    "Icon@3x.png",
    "Icon-60.png",
    "Icon-60@2x.png",
    "Icon-60@3x.png",
    "Icon-76.png",
    "Icon-76@2x.png",
    "Icon-Small.png",
    "Icon-Small@2x.png",
    "Icon-Small@3x.png",
    "Icon-Small-40.png",
    "Icon-Small-40@2x.png",
    "Icon-Small-40@3x.png",
    "Icon-83.5@2x.png",
    "Icon-1024.png",
    "AppIcon20x20.png",
    "AppIcon20x20@2x.png",
    "AppIcon20x20@3x.png",
    "AppIcon29x29.png",
    "AppIcon29x29@2x.png",
    "AppIcon29x29@3x.png",
    "AppIcon40x40.png",
    "AppIcon40x40@2x.png",
    "AppIcon40x40@3x.png",
    "AppIcon60x60@2x.png",
    "AppIcon60x60@3x.png",
    "AppIcon76x76.png",
    "AppIcon76x76@2x.png",
    "AppIcon83.5x83.5@2x.png",
    "AppIcon1024x1024.png",
];

/// Asset files, beyond the icon set, whose hashes also gate cache reuse.
const OTHER_ASSET_FILES: &[&str] = &[
    "Assets.car",
    "Base.lproj/LaunchScreen.storyboard",
    "Base.lproj/Main.storyboard",
];

fn push_icon_name(names: &mut Vec<String>, mut name: String) {
    if name.is_empty() {
        return;
    }
    if !name.ends_with(".png") {
        name.push_str(".png");
    }
    if !names.contains(&name) {
        names.push(name);
    }
}

/// The union of icon filenames named by the root `Info.plist`, plus every
/// conventional icon filename that actually exists on disk at the root.
pub fn icon_file_names(root: &Path, info: &Dictionary) -> Vec<String> {
    let mut names = Vec::new();

    if let Some(name) = info.get_string("CFBundleIconFile") {
        push_icon_name(&mut names, name.to_string());
    }

    if let Some(files) = info.get_string_array("CFBundleIconFiles") {
        for name in files {
            push_icon_name(&mut names, name);
        }
    }

    for key in ["CFBundleIcons", "CFBundleIcons~ipad"] {
        if let Some(files) =
            info.get_path_string_array(&format!("{key}.CFBundlePrimaryIcon.CFBundleIconFiles"))
        {
            for name in files {
                push_icon_name(&mut names, name);
            }
        }
    }

    for name in CONVENTIONAL_ICON_NAMES {
        if root.join(name).is_file() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Whether `relpath`'s current on-disk SHA-1 differs from (or is absent
/// from) the cached manifest's `files[relpath]` entry.
///
/// `cached_files` is the `files` map of the root bundle's previous
/// `_CodeSignature/CodeResources`, read back from disk; that is the only
/// place a per-file hash from the last successful run is recorded.
fn hash_changed_vs_cache(
    root: &Path,
    relpath: &str,
    cached_files: Option<&BTreeMap<String, Value>>,
) -> bool {
    let full = root.join(relpath);
    if !full.is_file() {
        return false;
    }

    let current = match digest::sha1_file_base64(&full) {
        Ok(hash) => hash,
        Err(_) => return true,
    };

    let cached = cached_files.and_then(|files| files.get(relpath)).and_then(|v| {
        v.as_string()
            .or_else(|| v.as_dictionary().and_then(|d| d.get("hash")?.as_string()))
    });

    match cached {
        Some(cached) if digest::strip_data_prefix(cached) == current => false,
        Some(_) => {
            info!("icon changed: {relpath}");
            true
        }
        None => {
            info!("new icon found: {relpath}");
            true
        }
    }
}

/// Whether the root's icon set or compiled asset catalog has changed since
/// `cached_files` (the root's previous `_CodeSignature/CodeResources`
/// `files` map) was recorded.
pub fn icons_changed(
    root: &Path,
    info: &Dictionary,
    cached_files: Option<&BTreeMap<String, Value>>,
) -> bool {
    let mut changed = false;

    for relpath in icon_file_names(root, info) {
        if hash_changed_vs_cache(root, &relpath, cached_files) {
            changed = true;
        }
    }

    for relpath in OTHER_ASSET_FILES {
        if hash_changed_vs_cache(root, relpath, cached_files) {
            changed = true;
        }
    }

    changed
}

/// Delete `Assets.car` at the root unconditionally, so the loader falls
/// back to the loose icon files this engine preserves. A missing file is
/// not an error; a failed removal is a warning, not a fatal error.
pub fn force_assets_car_regeneration(root: &Path) {
    match bundle_fs::walk::remove_file_if_exists(root.join("Assets.car")) {
        Ok(true) => info!("removed Assets.car to force regeneration from loose icons"),
        Ok(false) => {}
        Err(e) => warn!("could not remove Assets.car: {e}; continuing with existing compiled icons"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict_from_xml(xml: &str) -> Dictionary {
        plist::Value::from_reader_xml(std::io::Cursor::new(xml.as_bytes()))
            .unwrap()
            .into_dictionary()
            .unwrap()
    }

    #[test]
    fn icon_file_adds_png_suffix() {
        let info = dict_from_xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0"><dict>
<key>CFBundleIconFile</key><string>Icon</string>
</dict></plist>"#,
        );
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(icon_file_names(dir.path(), &info), vec!["Icon.png"]);
    }

    #[test]
    fn conventional_icons_are_detected_from_disk() {
        let info = Dictionary::new();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AppIcon60x60@2x.png"), b"x").unwrap();

        let names = icon_file_names(dir.path(), &info);
        assert!(names.contains(&"AppIcon60x60@2x.png".to_string()));
    }

    #[test]
    fn unchanged_icon_hash_reports_no_change() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Icon.png"), b"same").unwrap();

        let mut cached_files = BTreeMap::new();
        cached_files.insert(
            "Icon.png".to_string(),
            Value::String(digest::data_prefixed(&digest::sha1_base64(b"same"))),
        );

        assert!(!hash_changed_vs_cache(dir.path(), "Icon.png", Some(&cached_files)));
    }

    #[test]
    fn changed_icon_hash_reports_change() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Icon.png"), b"new-bytes").unwrap();

        let mut cached_files = BTreeMap::new();
        cached_files.insert(
            "Icon.png".to_string(),
            Value::String(digest::data_prefixed(&digest::sha1_base64(b"old-bytes"))),
        );

        assert!(hash_changed_vs_cache(dir.path(), "Icon.png", Some(&cached_files)));
    }

    #[test]
    fn force_assets_car_regeneration_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        force_assets_car_regeneration(dir.path());
        std::fs::write(dir.path().join("Assets.car"), b"x").unwrap();
        force_assets_car_regeneration(dir.path());
        assert!(!dir.path().join("Assets.car").exists());
        force_assets_car_regeneration(dir.path());
    }
}
