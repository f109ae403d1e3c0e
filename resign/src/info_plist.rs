// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mutating `Info.plist` identifiers, versions and display names, and
//! propagating a bundle-id rewrite down to nested plugins and watch
//! companions.

use {
    crate::error::ResignError,
    bundle_fs::{bundle::BundleKind, walk},
    log::{info, warn},
    plist::Value,
    std::path::Path,
};

/// Replace `CFBundleIdentifier` at the root, and propagate the change to
/// every nested plugin. Replace the version and/or display name if given.
/// Returns `true` if anything was written (the caller should force-sign).
pub fn modify_bundle_info(
    root: &Path,
    new_id: Option<&str>,
    new_version: Option<&str>,
    new_display_name: Option<&str>,
) -> Result<bool, ResignError> {
    let info_plist_path = root.join("Info.plist");
    let mut info = read_dict(&info_plist_path)?;
    let mut changed = false;

    if let Some(new_id) = new_id {
        let old_id = info
            .get("CFBundleIdentifier")
            .and_then(Value::as_string)
            .unwrap_or_default()
            .to_string();

        info.insert(
            "CFBundleIdentifier".to_string(),
            Value::String(new_id.to_string()),
        );
        info!("BundleId: {old_id} -> {new_id}");
        rewrite_plugin_ids(root, &old_id, new_id)?;
        changed = true;
    }

    if let Some(new_name) = new_display_name {
        info.insert(
            "CFBundleName".to_string(),
            Value::String(new_name.to_string()),
        );
        info.insert(
            "CFBundleDisplayName".to_string(),
            Value::String(new_name.to_string()),
        );

        for lproj in ["zh_CN.lproj", "zh-Hans.lproj"] {
            let strings_path = root.join(lproj).join("InfoPlist.strings");
            if strings_path.is_file() {
                update_localized_strings(&strings_path, new_name)?;
            }
        }
        changed = true;
    }

    if let Some(new_version) = new_version {
        info.insert(
            "CFBundleVersion".to_string(),
            Value::String(new_version.to_string()),
        );
        info.insert(
            "CFBundleShortVersionString".to_string(),
            Value::String(new_version.to_string()),
        );
        changed = true;
    }

    if changed {
        write_dict(&info_plist_path, &info)?;
    }

    Ok(changed)
}

/// Substring-replace `old` with `new` in every identifier key that embeds a
/// bundle id, across every nested `.app`/`.appex` directory. Substring (not
/// full-string) replacement is intentional: it propagates a shared prefix
/// through child identifiers like `com.example.app.widget`.
pub fn rewrite_plugin_ids(root: &Path, old: &str, new: &str) -> Result<(), ResignError> {
    let plugin_dirs: Vec<_> = walk::walk_all(root)
        .filter_map(|e| e.ok())
        .filter(|e| e.is_dir && e.path != root)
        .filter(|e| matches!(BundleKind::of_path(&e.path), Some(BundleKind::App | BundleKind::Appex)))
        .map(|e| e.path)
        .collect();

    for dir in plugin_dirs {
        let info_plist_path = dir.join("Info.plist");
        let mut info = match read_dict(&info_plist_path) {
            Ok(info) => info,
            Err(_) => {
                warn!("can't find plugin Info.plist: {}", info_plist_path.display());
                continue;
            }
        };

        let mut touched = false;

        if let Some(id) = info.get("CFBundleIdentifier").and_then(Value::as_string) {
            let rewritten = id.replace(old, new);
            if rewritten != id {
                touched = true;
            }
            info.insert("CFBundleIdentifier".to_string(), Value::String(rewritten));
        }

        if let Some(companion) = info
            .get("WKCompanionAppBundleIdentifier")
            .and_then(Value::as_string)
        {
            let rewritten = companion.replace(old, new);
            info.insert(
                "WKCompanionAppBundleIdentifier".to_string(),
                Value::String(rewritten),
            );
            touched = true;
        }

        if let Some(wk_app_id) = info
            .get("NSExtension")
            .and_then(Value::as_dictionary)
            .and_then(|ext| ext.get("NSExtensionAttributes"))
            .and_then(Value::as_dictionary)
            .and_then(|attrs| attrs.get("WKAppBundleIdentifier"))
            .and_then(Value::as_string)
        {
            let rewritten = wk_app_id.replace(old, new);
            if let Some(Value::Dictionary(ext)) = info.get_mut("NSExtension") {
                if let Some(Value::Dictionary(attrs)) = ext.get_mut("NSExtensionAttributes") {
                    attrs.insert(
                        "WKAppBundleIdentifier".to_string(),
                        Value::String(rewritten),
                    );
                }
            }
            touched = true;
        }

        if touched {
            write_dict(&info_plist_path, &info)?;
        }
    }

    Ok(())
}

fn update_localized_strings(path: &Path, new_name: &str) -> Result<(), ResignError> {
    let mut dict = read_dict(path)?;
    dict.insert("CFBundleName".to_string(), Value::String(new_name.to_string()));
    dict.insert(
        "CFBundleDisplayName".to_string(),
        Value::String(new_name.to_string()),
    );
    write_dict(path, &dict)
}

fn read_dict(path: &Path) -> Result<plist::Dictionary, ResignError> {
    let data = walk::read_file(path)?;
    let value = Value::from_reader_xml(std::io::Cursor::new(data))
        .map_err(|e| ResignError::plist(path, e))?;
    value
        .into_dictionary()
        .ok_or_else(|| ResignError::MissingPlistField {
            path: path.to_path_buf(),
            field: "<root dictionary>",
        })
}

fn write_dict(path: &Path, dict: &plist::Dictionary) -> Result<(), ResignError> {
    let mut buf = Vec::new();
    Value::Dictionary(dict.clone())
        .to_writer_xml(&mut buf)
        .map_err(|e| ResignError::plist(path, e))?;
    walk::write_file(path, buf)?;
    Ok(())
}
