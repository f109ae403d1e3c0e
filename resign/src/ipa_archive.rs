// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extracting a `Payload/*.app` directory out of an `.ipa` archive and
//! repacking it afterwards.
//!
//! The signing driver only ever operates on a directory tree; this module
//! is the boundary that lets the `resign` binary accept a zipped `.ipa` the
//! same way it accepts a bare `.app` directory.

use {
    crate::error::ResignError,
    bundle_fs::walk,
    std::{
        io::{Read, Write},
        path::{Path, PathBuf},
    },
};

/// Unpack `ipa_path` into `dest_dir` and return the path to the `.app`
/// directory inside `Payload/`.
///
/// `dest_dir` is created if it does not already exist. Zip entries that
/// mark themselves as directories are skipped; parent directories are
/// created implicitly as files are written.
pub fn extract(ipa_path: &Path, dest_dir: &Path) -> Result<PathBuf, ResignError> {
    let file = std::fs::File::open(ipa_path).map_err(|e| ResignError::io(ipa_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ResignError::zip(ipa_path, e))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| ResignError::zip(ipa_path, e))?;

        let Some(relative_path) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };

        let out_path = dest_dir.join(&relative_path);

        if entry.is_dir() {
            walk::create_dir_all(&out_path)?;
            continue;
        }

        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf).map_err(|e| ResignError::io(&out_path, e))?;
        walk::write_file(&out_path, &buf)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                .map_err(|e| ResignError::io(&out_path, e))?;
        }
    }

    find_payload_app(dest_dir)
}

fn find_payload_app(dest_dir: &Path) -> Result<PathBuf, ResignError> {
    let payload_dir = dest_dir.join("Payload");
    let app_dir = std::fs::read_dir(&payload_dir)
        .map_err(|e| ResignError::io(&payload_dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.is_dir() && walk::has_suffix(p, ".app"));

    app_dir.ok_or_else(|| ResignError::NoPayloadDirectory(dest_dir.to_path_buf()))
}

/// Repack `payload_dir` (the directory directly containing `Payload/`) into
/// a fresh `.ipa` at `ipa_path`, preserving each entry's executable bit.
pub fn repack(payload_dir: &Path, ipa_path: &Path) -> Result<(), ResignError> {
    let file = std::fs::File::create(ipa_path).map_err(|e| ResignError::io(ipa_path, e))?;
    let mut zip_writer = zip::ZipWriter::new(file);

    for entry in walk::walk_all(payload_dir) {
        let entry = entry?;
        if entry.is_dir {
            continue;
        }

        let relative = entry
            .path
            .strip_prefix(payload_dir)
            .unwrap_or(&entry.path)
            .to_string_lossy()
            .replace('\\', "/");

        let options = zip::write::FileOptions::default().unix_permissions(unix_mode(&entry.path));
        zip_writer
            .start_file(relative, options)
            .map_err(|e| ResignError::zip(ipa_path, e))?;

        let data = walk::read_file(&entry.path)?;
        zip_writer.write_all(&data).map_err(|e| ResignError::io(ipa_path, e))?;
    }

    zip_writer.finish().map_err(|e| ResignError::zip(ipa_path, e))?;
    Ok(())
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode())
        .unwrap_or(0o644)
}

#[cfg(not(unix))]
fn unix_mode(_path: &Path) -> u32 {
    0o644
}
