// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Errors produced while walking or opening bundles on disk.
#[derive(Debug, Error)]
pub enum BundleFsError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a directory")]
    NotADirectory(std::path::PathBuf),

    #[error("no Info.plist found at {0}")]
    NoInfoPlist(std::path::PathBuf),

    #[error("Info.plist at {0} is not a dictionary at its root")]
    InfoPlistNotADictionary(std::path::PathBuf),

    #[error("error parsing plist at {path}: {source}")]
    PlistParse {
        path: std::path::PathBuf,
        #[source]
        source: plist::Error,
    },

    #[error("directory walk error: {0}")]
    Walkdir(#[from] walkdir::Error),
}
