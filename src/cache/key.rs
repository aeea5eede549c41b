//! Cache key derivation for mirrored images
//!
//! Keys are derived from the source URL string, never from the downloaded
//! bytes, so a key can be computed before anything is fetched.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash used to turn a URL into a filename stem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// 32-bit rolling hash, 8 hex chars. Matches files mirrored by the
    /// existing site tooling; distinct URLs can collide.
    #[default]
    Compat32,
    /// Leading 128 bits of SHA-256, 32 hex chars.
    Sha256,
}

/// Generate the cache key for a URL under the given scheme.
pub fn cache_key(url: &str, scheme: KeyScheme) -> String {
    match scheme {
        KeyScheme::Compat32 => compat_hash(url),
        KeyScheme::Sha256 => {
            let digest = Sha256::digest(url.as_bytes());
            digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
        }
    }
}

/// `hash = hash * 31 + unit` over UTF-16 code units, wrapped to `i32`.
///
/// The absolute value is rendered as zero-padded lowercase hex. `i32::MIN`
/// has no positive counterpart in `i32`, so it renders as `80000000`.
pub fn compat_hash(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    format!("{:08x}", hash.unsigned_abs())
}

/// Whether `file_name` is the cached file for `key`.
///
/// The key must be the whole stem: `3a192566.png` matches `3a192566`, while
/// `3a1925661.png` does not.
pub fn file_matches_key(file_name: &str, key: &str) -> bool {
    file_name
        .strip_prefix(key)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
