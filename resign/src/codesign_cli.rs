// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A [`MachOSigner`]/[`SignAsset`] pair that shells out to the platform
//! `codesign` and `insert_dylib` executables rather than parsing Mach-O
//! binaries in-process. Mach-O signature layout is out of scope for this
//! crate; this is the concrete default the CLI binary wires in.

use {
    crate::macho::{MachOFile, MachOSigner, SignAsset},
    std::{path::Path, process::Command},
};

pub struct CliSignAsset {
    pub team_id: String,
    pub subject_cn: String,
    pub provisioning_profile: Option<Vec<u8>>,
}

impl SignAsset for CliSignAsset {
    fn team_id(&self) -> &str {
        &self.team_id
    }

    fn subject_cn(&self) -> &str {
        &self.subject_cn
    }

    fn provisioning_profile_bytes(&self) -> Option<&[u8]> {
        self.provisioning_profile.as_deref()
    }
}

pub struct CodesignCliSigner;

impl MachOSigner for CodesignCliSigner {
    fn init(&self, path: &Path) -> Result<Box<dyn MachOFile>, String> {
        Ok(Box::new(CliMachOFile { path: path.to_path_buf() }))
    }
}

struct CliMachOFile {
    path: std::path::PathBuf,
}

impl MachOFile for CliMachOFile {
    fn inject_dylib(&mut self, weak: bool, dylib_ref: &str) -> Result<bool, String> {
        let mut args = vec![dylib_ref.to_string(), self.path.to_string_lossy().into_owned()];
        if weak {
            args.insert(0, "--weak".to_string());
        }

        let output = Command::new("insert_dylib")
            .arg("--inplace")
            .args(&args)
            .output()
            .map_err(|e| format!("failed to run insert_dylib: {e}"))?;

        if output.status.success() {
            Ok(true)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("already") {
                Ok(false)
            } else {
                Err(format!("insert_dylib failed for {}: {stderr}", self.path.display()))
            }
        }
    }

    fn sign(
        &mut self,
        asset: &dyn SignAsset,
        force: bool,
        bundle_id: &str,
        _info_plist_sha1: &[u8],
        _info_plist_sha256: &[u8],
        _code_resources_plist: &[u8],
    ) -> Result<(), String> {
        let mut command = Command::new("codesign");
        command.arg("--sign").arg(asset.subject_cn()).arg("--verbose");
        if force {
            command.arg("--force");
        }
        if !bundle_id.is_empty() {
            command.arg("--identifier").arg(bundle_id);
        }
        command.arg(&self.path);

        let output = command
            .output()
            .map_err(|e| format!("failed to run codesign: {e}"))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "codesign failed for {}: {}",
                self.path.display(),
                String::from_utf8_lossy(&output.stderr)
            ))
        }
    }
}
