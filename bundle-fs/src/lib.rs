// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Directory walking and bundle discovery primitives shared by the
//! re-signing engine.

pub mod bundle;
pub mod error;
pub mod walk;

pub use bundle::{find_nested_bundles, find_root, Bundle, BundleKind};
pub use error::BundleFsError;
pub use walk::{walk, walk_all, WalkEntry};
