// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bundle walker and code-resources engine for re-signing iOS/macOS
//! application bundles.
//!
//! This crate figures out *what* to re-sign and in *what order* -
//! enumerating nested bundles deepest-first, reconstructing
//! `_CodeSignature/CodeResources`, deciding whether a cached signing plan
//! can be reused - and leaves *how* to write an actual Mach-O signature to
//! the [`macho`] collaborator traits.

pub mod asset_change;
pub mod cache;
pub mod code_resources;
pub mod codesign_cli;
pub mod digest;
pub mod driver;
pub mod error;
pub mod info_plist;
pub mod ipa_archive;
pub mod macho;
pub mod plist_ext;
pub mod sign_plan;

pub use {
    code_resources::CodeResources,
    codesign_cli::{CliSignAsset, CodesignCliSigner},
    driver::{run, SigningOptions},
    error::ResignError,
    macho::{MachOFile, MachOSigner, SignAsset},
    sign_plan::SignNode,
};
