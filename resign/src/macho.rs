// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborator interfaces consumed, but not implemented, by this engine:
//! Mach-O signature writing and the identity material behind it.
//!
//! Mach-O parsing, signature blob layout, code-directory hashing, dylib
//! injection, and certificate/private-key/provisioning-profile handling are
//! all out of scope here; a concrete implementation plugs in through these
//! traits.

use std::path::Path;

/// The certificate, private key, team id, and provisioning profile behind a
/// signing operation. Opaque to this engine beyond what it needs to pass
/// through to the Mach-O signer and to the bundle's
/// `embedded.mobileprovision`.
pub trait SignAsset {
    fn team_id(&self) -> &str;
    fn subject_cn(&self) -> &str;
    /// Raw bytes of the provisioning profile to embed, if any.
    fn provisioning_profile_bytes(&self) -> Option<&[u8]>;
}

/// A Mach-O signer bound to one parsed executable or dylib.
pub trait MachOFile {
    /// Record a dylib for injection as a load command. Returns whether the
    /// injection actually happened (a duplicate load command is a no-op,
    /// not a failure).
    fn inject_dylib(&mut self, weak: bool, dylib_ref: &str) -> Result<bool, String>;

    /// Write a fresh embedded signature. `bundle_id` and the raw (not
    /// base64) `Info.plist` digests are empty when signing a standalone
    /// dylib rather than a bundle's main executable.
    #[allow(clippy::too_many_arguments)]
    fn sign(
        &mut self,
        asset: &dyn SignAsset,
        force: bool,
        bundle_id: &str,
        info_plist_sha1: &[u8],
        info_plist_sha256: &[u8],
        code_resources_plist: &[u8],
    ) -> Result<(), String>;
}

/// Opens Mach-O files for signing.
pub trait MachOSigner {
    fn init(&self, path: &Path) -> Result<Box<dyn MachOFile>, String>;
}
