// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SHA-1 and SHA-256 digesting, base64-encoded, in the `"data:<b64>"` form
//! the manifest and the cache both store hashes in.

use {crate::error::ResignError, base64::Engine, std::path::Path};

const DATA_PREFIX: &str = "data:";

/// Base64-encode `bytes` with the standard alphabet.
pub fn base64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 string back to bytes.
pub fn base64_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(s)
}

/// Wrap a base64 digest in the `"data:<b64>"` form used throughout the
/// manifest and the cache.
pub fn data_prefixed(b64: &str) -> String {
    format!("{DATA_PREFIX}{b64}")
}

/// Strip a leading `"data:"` prefix, if present.
pub fn strip_data_prefix(s: &str) -> &str {
    s.strip_prefix(DATA_PREFIX).unwrap_or(s)
}

/// SHA-1 digest of `data`, base64-encoded.
pub fn sha1_base64(data: &[u8]) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, data);
    base64_encode(digest.as_ref())
}

/// SHA-256 digest of `data`, base64-encoded.
pub fn sha256_base64(data: &[u8]) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, data);
    base64_encode(digest.as_ref())
}

/// SHA-1 digest of a file's contents, base64-encoded.
pub fn sha1_file_base64(path: &Path) -> Result<String, ResignError> {
    let data = bundle_fs::walk::read_file(path)?;
    Ok(sha1_base64(&data))
}

/// Both digests of a file's contents, base64-encoded, read once.
pub fn sha_pair_file_base64(path: &Path) -> Result<(String, String), ResignError> {
    let data = bundle_fs::walk::read_file(path)?;
    Ok((sha1_base64(&data), sha256_base64(&data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_of_hi_matches_known_vector() {
        // sha1("hi") = c22b5f9178342609428d6f51b2c5af4c0bde6a42, base64 of those
        // 20 raw bytes is the value zsign-compatible caches store.
        let digest = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, b"hi");
        assert_eq!(hex::encode(digest.as_ref()), "c22b5f9178342609428d6f51b2c5af4c0bde6a42");
        assert_eq!(sha1_base64(b"hi"), base64_encode(digest.as_ref()));
    }

    #[test]
    fn data_prefix_round_trips() {
        let b64 = sha1_base64(b"hello");
        let wrapped = data_prefixed(&b64);
        assert_eq!(strip_data_prefix(&wrapped), b64);
    }

    #[test]
    fn strip_data_prefix_is_a_no_op_without_prefix() {
        assert_eq!(strip_data_prefix("abc123"), "abc123");
    }
}
