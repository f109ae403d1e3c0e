// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orchestrates C4-C7 against a cache (C9) and the external Mach-O
//! collaborator, applying incremental updates and signing depth-first.

use {
    crate::{
        asset_change, cache,
        code_resources::CodeResources,
        digest,
        error::ResignError,
        info_plist,
        macho::{MachOSigner, SignAsset},
        sign_plan::{self, SignNode},
    },
    bundle_fs::walk,
    log::{info, warn},
    std::path::{Path, PathBuf},
};

/// Inputs to one signing run.
pub struct SigningOptions<'a> {
    pub start_dir: &'a Path,
    pub new_bundle_id: Option<&'a str>,
    pub new_version: Option<&'a str>,
    pub new_display_name: Option<&'a str>,
    pub inject_dylibs: &'a [PathBuf],
    pub force: bool,
    pub weak_inject: bool,
    pub enable_cache: bool,
}

/// The immutable decisions made once, before any node is signed: whether
/// the cache is being bypassed, and whether icon/asset changes force every
/// node (not just the ones whose own files changed) to regenerate.
#[derive(Debug, Clone, Copy)]
struct Policy {
    force: bool,
    icons_changed: bool,
}

/// Run one full signing pass over the bundle reachable from
/// `options.start_dir`, per `options`.
pub fn run(
    options: &SigningOptions,
    asset: &dyn SignAsset,
    signer: &dyn MachOSigner,
    cache_base: &Path,
) -> Result<(), ResignError> {
    let root_dir = sign_plan::find_root(options.start_dir)?;
    let mut force = options.force;

    if options.new_bundle_id.is_some()
        || options.new_version.is_some()
        || options.new_display_name.is_some()
    {
        force = true;
        info_plist::modify_bundle_info(
            &root_dir,
            options.new_bundle_id,
            options.new_version,
            options.new_display_name,
        )?;
    }

    let mobileprovision_path = root_dir.join("embedded.mobileprovision");
    walk::remove_file_if_exists(&mobileprovision_path)?;
    if let Some(bytes) = asset.provisioning_profile_bytes() {
        walk::write_file(&mobileprovision_path, bytes)?;
    }

    let mut inject_refs = Vec::new();
    for dylib in options.inject_dylibs {
        let file_name = dylib.file_name().ok_or_else(|| {
            ResignError::io(
                dylib,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "dylib path has no file name"),
            )
        })?;
        walk::copy_file(dylib, root_dir.join(file_name))?;
        inject_refs.push(format!("@executable_path/{}", file_name.to_string_lossy()));
        force = true;
    }

    if !cache::exists(cache_base, &root_dir)? {
        force = true;
    }

    asset_change::force_assets_car_regeneration(&root_dir);

    let mut icons_changed = false;
    if force {
        icons_changed = true;
    } else {
        let info = read_root_info_plist(&root_dir)?;
        let existing_manifest_path = root_dir.join("_CodeSignature/CodeResources");
        let cached_files = if existing_manifest_path.is_file() {
            CodeResources::read(&existing_manifest_path).ok().map(|m| m.files)
        } else {
            None
        };

        if asset_change::icons_changed(&root_dir, &info, cached_files.as_ref()) {
            info!("app icons or Assets.car changed, forcing regeneration for all bundles");
            icons_changed = true;
            force = true;
        }
    }

    let policy = Policy { force, icons_changed };

    let mut root_node = if policy.force {
        let mut node = sign_plan::get_sign_folder_info(&root_dir, "/".to_string(), true)?;
        node.folders = sign_plan::enumerate(&root_dir);
        node.files = sign_plan::collect_loose_dylibs(&root_dir)?;
        node.changed = compute_root_changed(&node);
        node
    } else {
        cache::load(cache_base, &root_dir)?
            .ok_or_else(|| ResignError::CacheDecodeFailure(root_dir.join(".zsign_cache")))?
    };

    let sign_result = sign_node(
        &root_dir,
        &mut root_node,
        &policy,
        &inject_refs,
        options.weak_inject,
        true,
        signer,
        asset,
    );

    if sign_result.is_ok() && options.enable_cache {
        cache::save(cache_base, &root_dir, &root_node)?;
    }

    if let Err(e) = walk::remove_file_if_exists(&mobileprovision_path) {
        warn!("could not remove embedded.mobileprovision after signing: {e}");
    }

    sign_result
}

/// Union, for the root node, of everything whose hash might need
/// refreshing in the root's own `CodeResources` on a patched (non-regenerate)
/// run: its loose dylibs, and for each nested bundle, that bundle's own
/// `changed` set plus its `_CodeSignature/CodeResources` and main
/// executable (both of which are rewritten every time that bundle is
/// signed). `embedded.mobileprovision` is appended unconditionally.
fn compute_root_changed(root: &SignNode) -> Vec<String> {
    let mut changed = root.files.clone();

    for child in &root.folders {
        changed.extend(child.changed.iter().cloned());
        changed.push(format!("{}/_CodeSignature/CodeResources", child.path));
        changed.push(format!("{}/{}", child.path, child.bundle_executable));
    }

    changed.push("embedded.mobileprovision".to_string());
    changed
}

fn node_dir(root_dir: &Path, node: &SignNode) -> PathBuf {
    if node.path == "/" {
        root_dir.to_path_buf()
    } else {
        root_dir.join(&node.path)
    }
}

#[allow(clippy::too_many_arguments)]
fn sign_node(
    root_dir: &Path,
    node: &mut SignNode,
    policy: &Policy,
    inject_refs: &[String],
    weak_inject: bool,
    is_root: bool,
    signer: &dyn MachOSigner,
    asset: &dyn SignAsset,
) -> Result<(), ResignError> {
    for dylib_relpath in node.files.clone() {
        let dylib_path = root_dir.join(&dylib_relpath);
        info!("sign file: {dylib_relpath}");
        let mut file = signer
            .init(&dylib_path)
            .map_err(|_| ResignError::MachOFailure(dylib_path.clone()))?;
        file.sign(asset, policy.force, "", &[], &[], &[])
            .map_err(|_| ResignError::MachOFailure(dylib_path.clone()))?;
    }

    for child in &mut node.folders {
        sign_node(root_dir, child, policy, &[], weak_inject, false, signer, asset)?;
    }

    let dir = node_dir(root_dir, node);
    let code_signature_dir = dir.join("_CodeSignature");
    walk::create_dir_all(&code_signature_dir)?;
    let code_resources_path = code_signature_dir.join("CodeResources");

    let force_regenerate = policy.force || policy.icons_changed;

    let manifest = if force_regenerate || !code_resources_path.is_file() {
        info!("sign folder: {} ({})", node.path, node.bundle_executable);
        CodeResources::build(&dir, &node.bundle_executable)?
    } else {
        let mut manifest = CodeResources::read(&code_resources_path)?;
        let prefix = if node.path == "/" {
            String::new()
        } else {
            format!("{}/", node.path)
        };
        let relative_changed: Vec<String> = node
            .changed
            .iter()
            .filter_map(|p| p.strip_prefix(&prefix).map(str::to_string))
            .collect();
        manifest.patch_changed(&dir, &relative_changed)?;
        manifest
    };

    manifest.write(&code_resources_path)?;

    let executable_path = dir.join(&node.bundle_executable);
    let mut exe_file = signer
        .init(&executable_path)
        .map_err(|_| ResignError::MachOFailure(executable_path.clone()))?;

    let mut local_force = policy.force;
    if is_root {
        for dylib_ref in inject_refs {
            match exe_file.inject_dylib(weak_inject, dylib_ref) {
                Ok(true) => local_force = true,
                Ok(false) => {}
                Err(_) => return Err(ResignError::MachOFailure(executable_path.clone())),
            }
        }
    }

    let info_sha1 = digest::base64_decode(&node.sha1).map_err(|_| ResignError::HashFailure(dir.clone()))?;
    let info_sha256 = digest::base64_decode(&node.sha256).map_err(|_| ResignError::HashFailure(dir.clone()))?;
    let manifest_bytes = manifest.to_xml_bytes()?;

    exe_file
        .sign(asset, local_force, &node.bundle_id, &info_sha1, &info_sha256, &manifest_bytes)
        .map_err(|_| ResignError::MachOFailure(executable_path))?;

    Ok(())
}

fn read_root_info_plist(root_dir: &Path) -> Result<plist::Dictionary, ResignError> {
    let path = root_dir.join("Info.plist");
    let data = walk::read_file(&path)?;
    plist::Value::from_reader_xml(std::io::Cursor::new(data))
        .map_err(|e| ResignError::plist(&path, e))?
        .into_dictionary()
        .ok_or(ResignError::MissingPlistField {
            path,
            field: "<root dictionary>",
        })
}
