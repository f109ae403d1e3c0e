// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios against [`resign::driver::run`]: cache reuse,
//! identifier propagation, icon invalidation, dylib injection, and signing
//! order, driven through a recording [`MachOSigner`] double since actual
//! Mach-O signing is out of scope.

use {
    resign::{driver, ipa_archive, CodeResources, MachOFile, MachOSigner, SignAsset},
    std::{
        cell::RefCell,
        path::{Path, PathBuf},
        rc::Rc,
    },
};

#[derive(Debug, Clone, PartialEq)]
struct SignCall {
    path: PathBuf,
    force: bool,
    bundle_id: String,
}

#[derive(Default)]
struct RecordingSigner {
    calls: Rc<RefCell<Vec<SignCall>>>,
    injections: Rc<RefCell<Vec<String>>>,
}

struct RecordingFile {
    path: PathBuf,
    calls: Rc<RefCell<Vec<SignCall>>>,
    injections: Rc<RefCell<Vec<String>>>,
}

impl MachOFile for RecordingFile {
    fn inject_dylib(&mut self, _weak: bool, dylib_ref: &str) -> Result<bool, String> {
        self.injections.borrow_mut().push(dylib_ref.to_string());
        Ok(true)
    }

    fn sign(
        &mut self,
        _asset: &dyn SignAsset,
        force: bool,
        bundle_id: &str,
        _info_plist_sha1: &[u8],
        _info_plist_sha256: &[u8],
        _code_resources_plist: &[u8],
    ) -> Result<(), String> {
        self.calls.borrow_mut().push(SignCall {
            path: self.path.clone(),
            force,
            bundle_id: bundle_id.to_string(),
        });
        Ok(())
    }
}

impl MachOSigner for RecordingSigner {
    fn init(&self, path: &Path) -> Result<Box<dyn MachOFile>, String> {
        Ok(Box::new(RecordingFile {
            path: path.to_path_buf(),
            calls: self.calls.clone(),
            injections: self.injections.clone(),
        }))
    }
}

struct TestAsset {
    provisioning_profile: Option<Vec<u8>>,
}

impl SignAsset for TestAsset {
    fn team_id(&self) -> &str {
        "TEAMID1234"
    }

    fn subject_cn(&self) -> &str {
        "iPhone Distribution: Example"
    }

    fn provisioning_profile_bytes(&self) -> Option<&[u8]> {
        self.provisioning_profile.as_deref()
    }
}

fn no_profile_asset() -> TestAsset {
    TestAsset { provisioning_profile: None }
}

fn write_plist(path: &Path, entries: &[(&str, &str)]) {
    let mut dict = plist::Dictionary::new();
    for (k, v) in entries {
        dict.insert(k.to_string(), plist::Value::String(v.to_string()));
    }
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut buf = Vec::new();
    plist::Value::Dictionary(dict).to_writer_xml(&mut buf).unwrap();
    std::fs::write(path, buf).unwrap();
}

fn read_plist(path: &Path) -> plist::Dictionary {
    let data = std::fs::read(path).unwrap();
    plist::Value::from_reader_xml(std::io::Cursor::new(data))
        .unwrap()
        .into_dictionary()
        .unwrap()
}

fn write_bundle(dir: &Path, id: &str, exe: &str) {
    write_plist(
        &dir.join("Info.plist"),
        &[("CFBundleIdentifier", id), ("CFBundleExecutable", exe), ("CFBundleVersion", "1.0")],
    );
    std::fs::write(dir.join(exe), b"stub-macho-bytes").unwrap();
}

fn default_options<'a>(bundle: &'a Path, inject: &'a [PathBuf]) -> driver::SigningOptions<'a> {
    driver::SigningOptions {
        start_dir: bundle,
        new_bundle_id: None,
        new_version: None,
        new_display_name: None,
        inject_dylibs: inject,
        force: false,
        weak_inject: false,
        enable_cache: true,
    }
}

#[test]
fn first_run_builds_manifest_and_signs_the_executable() {
    let workdir = tempfile::tempdir().unwrap();
    let root = workdir.path().join("Root.app");
    write_bundle(&root, "com.example.app", "Main");

    let signer = RecordingSigner::default();
    let asset = no_profile_asset();
    let options = default_options(&root, &[]);

    driver::run(&options, &asset, &signer, workdir.path()).unwrap();

    assert!(root.join("_CodeSignature/CodeResources").is_file());
    let calls = signer.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, root.join("Main"));
    assert!(calls[0].force, "no cache existed yet, so this run must be forced");
    assert_eq!(calls[0].bundle_id, "com.example.app");
}

#[test]
fn second_run_with_no_changes_reuses_the_cache_and_does_not_force() {
    let workdir = tempfile::tempdir().unwrap();
    let root = workdir.path().join("Root.app");
    write_bundle(&root, "com.example.app", "Main");

    let asset = no_profile_asset();

    let first_signer = RecordingSigner::default();
    driver::run(&default_options(&root, &[]), &asset, &first_signer, workdir.path()).unwrap();
    let manifest_after_first = std::fs::read(root.join("_CodeSignature/CodeResources")).unwrap();

    let second_signer = RecordingSigner::default();
    driver::run(&default_options(&root, &[]), &asset, &second_signer, workdir.path()).unwrap();
    let manifest_after_second = std::fs::read(root.join("_CodeSignature/CodeResources")).unwrap();

    let calls = second_signer.calls.borrow();
    assert!(!calls[0].force, "nothing changed, so the cached plan should be reused");
    assert_eq!(
        manifest_after_first, manifest_after_second,
        "a true no-op re-run must not perturb the manifest bytes"
    );
}

#[test]
fn bundle_id_rewrite_propagates_to_a_nested_plugin() {
    let workdir = tempfile::tempdir().unwrap();
    let root = workdir.path().join("Root.app");
    write_bundle(&root, "com.example.app", "Main");

    let plugin = root.join("PlugIns/Ext.appex");
    write_bundle(&plugin, "com.example.app.ext", "Ext");

    let signer = RecordingSigner::default();
    let asset = no_profile_asset();
    let mut options = default_options(&root, &[]);
    options.new_bundle_id = Some("com.example.renamed");

    driver::run(&options, &asset, &signer, workdir.path()).unwrap();

    let plugin_info = read_plist(&plugin.join("Info.plist"));
    assert_eq!(
        plugin_info.get("CFBundleIdentifier").and_then(plist::Value::as_string),
        Some("com.example.renamed.ext")
    );

    let calls = signer.calls.borrow();
    assert!(calls.iter().any(|c| c.bundle_id == "com.example.renamed"));
}

#[test]
fn icon_change_invalidates_the_cache_and_forces_regeneration() {
    let workdir = tempfile::tempdir().unwrap();
    let root = workdir.path().join("Root.app");
    write_bundle(&root, "com.example.app", "Main");
    std::fs::write(root.join("Icon.png"), b"original-icon").unwrap();

    let asset = no_profile_asset();
    driver::run(&default_options(&root, &[]), &asset, &RecordingSigner::default(), workdir.path())
        .unwrap();

    std::fs::write(root.join("Icon.png"), b"a-completely-different-icon").unwrap();

    let second_signer = RecordingSigner::default();
    driver::run(&default_options(&root, &[]), &asset, &second_signer, workdir.path()).unwrap();

    let calls = second_signer.calls.borrow();
    assert!(calls[0].force, "a changed icon must force full regeneration even without --force");
}

#[test]
fn injected_dylib_is_copied_and_referenced_by_executable_path() {
    let workdir = tempfile::tempdir().unwrap();
    let root = workdir.path().join("Root.app");
    write_bundle(&root, "com.example.app", "Main");

    let dylib_src = workdir.path().join("libextra.dylib");
    std::fs::write(&dylib_src, b"fake-dylib-bytes").unwrap();

    let signer = RecordingSigner::default();
    let asset = no_profile_asset();
    let inject = vec![dylib_src.clone()];
    let mut options = default_options(&root, &inject);
    options.weak_inject = true;

    driver::run(&options, &asset, &signer, workdir.path()).unwrap();

    assert!(root.join("libextra.dylib").is_file());
    assert_eq!(
        signer.injections.borrow().as_slice(),
        ["@executable_path/libextra.dylib"]
    );
    assert!(signer.calls.borrow()[0].force, "injecting a dylib forces a root re-sign");
}

#[test]
fn nested_framework_signs_before_the_root_executable() {
    let workdir = tempfile::tempdir().unwrap();
    let root = workdir.path().join("Root.app");
    write_bundle(&root, "com.example.app", "Main");

    let framework = root.join("Frameworks/Shared.framework");
    write_bundle(&framework, "com.example.app.shared", "Shared");

    let signer = RecordingSigner::default();
    let asset = no_profile_asset();

    driver::run(&default_options(&root, &[]), &asset, &signer, workdir.path()).unwrap();

    let calls = signer.calls.borrow();
    let framework_index = calls.iter().position(|c| c.path == framework.join("Shared")).unwrap();
    let root_index = calls.iter().position(|c| c.path == root.join("Main")).unwrap();
    assert!(framework_index < root_index, "nested bundles must sign before the root");
}

#[test]
fn embedded_mobileprovision_does_not_survive_a_run() {
    let workdir = tempfile::tempdir().unwrap();
    let root = workdir.path().join("Root.app");
    write_bundle(&root, "com.example.app", "Main");

    let asset = TestAsset { provisioning_profile: Some(b"fake-profile-bytes".to_vec()) };
    driver::run(&default_options(&root, &[]), &asset, &RecordingSigner::default(), workdir.path())
        .unwrap();

    assert!(!root.join("embedded.mobileprovision").exists());
}

#[test]
fn locversion_plist_is_never_cataloged_in_the_resources_manifest() {
    let workdir = tempfile::tempdir().unwrap();
    let root = workdir.path().join("Root.app");
    write_bundle(&root, "com.example.app", "Main");
    std::fs::create_dir_all(root.join("zh_CN.lproj")).unwrap();
    std::fs::write(root.join("zh_CN.lproj/locversion.plist"), b"x").unwrap();

    let asset = no_profile_asset();
    driver::run(&default_options(&root, &[]), &asset, &RecordingSigner::default(), workdir.path())
        .unwrap();

    let manifest = CodeResources::read(&root.join("_CodeSignature/CodeResources")).unwrap();
    assert!(!manifest.files.contains_key("zh_CN.lproj/locversion.plist"));
}

#[test]
fn signing_an_ipa_archive_round_trips_through_extraction_and_repacking() {
    let workdir = tempfile::tempdir().unwrap();
    let payload_root = workdir.path().join("payload_root");
    let app_dir = payload_root.join("Payload/Main.app");
    write_bundle(&app_dir, "com.example.app", "Main");

    let ipa_path = workdir.path().join("App.ipa");
    ipa_archive::repack(&payload_root, &ipa_path).unwrap();

    let extraction_dir = tempfile::tempdir().unwrap();
    let extracted_app = ipa_archive::extract(&ipa_path, extraction_dir.path()).unwrap();

    let signer = RecordingSigner::default();
    let asset = no_profile_asset();
    driver::run(&default_options(&extracted_app, &[]), &asset, &signer, extraction_dir.path())
        .unwrap();

    assert!(extracted_app.join("_CodeSignature/CodeResources").is_file());

    ipa_archive::repack(extraction_dir.path(), &ipa_path).unwrap();
    let resigned_app = ipa_archive::extract(&ipa_path, workdir.path().join("verify").as_path()).unwrap();
    assert!(resigned_app.join("_CodeSignature/CodeResources").is_file());
}
