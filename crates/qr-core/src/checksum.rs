//! SHA-256 checksums for change detection and test-id disambiguation.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 checksum of a string as lowercase hex
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Short content hash used to disambiguate generic test ids.
///
/// The same test macro applied with different arguments (or to different
/// columns) must yield distinct unique_ids; the first 10 hex characters of
/// the SHA-256 of the resolved kwargs are appended as a suffix.
pub fn short_hash(s: &str) -> String {
    compute_checksum(s)[..10].to_string()
}
