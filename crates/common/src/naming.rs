//! Deterministic resource naming

use sha2::{Digest, Sha256};

/// Length of the hex prefix kept by [`short_hash`]
const SHORT_HASH_LEN: usize = 8;

/// Returns the first 8 hex characters of the SHA-256 digest of `s`
///
/// Hashes are kept short so that derived names stay within the length limits
/// of downstream resource names.
pub fn short_hash(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(SHORT_HASH_LEN);
    hash
}

/// `<logical>-<short_hash(discriminator)>`
pub fn derived_name(logical: &str, discriminator: &str) -> String {
    format!("{}-{}", logical, short_hash(discriminator))
}

/// Lower-case `name` and drop every character S3 does not allow in bucket names
pub fn safe_bucket_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}
