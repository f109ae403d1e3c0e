// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the re-signing engine.
#[derive(Debug, Error)]
pub enum ResignError {
    #[error("{0} does not contain a signable .app or .appex")]
    NotABundle(PathBuf),

    #[error("{field} missing from Info.plist at {path}")]
    MissingPlistField { path: PathBuf, field: &'static str },

    #[error("Mach-O signer rejected {0}")]
    MachOFailure(PathBuf),

    #[error("I/O error at {path}: {source}")]
    IOFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cached manifest at {0} could not be decoded, forcing a full sign")]
    CacheDecodeFailure(PathBuf),

    #[error("hash computation failed on {0}")]
    HashFailure(PathBuf),

    #[error("plist error at {path}: {source}")]
    PlistFailure {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },

    #[error("zip archive error at {path}: {source}")]
    ZipFailure {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{0} contains no Payload/*.app directory")]
    NoPayloadDirectory(PathBuf),

    #[error(transparent)]
    Fs(#[from] bundle_fs::BundleFsError),
}

impl ResignError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::IOFailure {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn plist(path: impl AsRef<std::path::Path>, source: plist::Error) -> Self {
        Self::PlistFailure {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn zip(path: impl AsRef<std::path::Path>, source: zip::result::ZipError) -> Self {
        Self::ZipFailure {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
