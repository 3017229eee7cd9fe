use sha2::{Digest, Sha256};

/// Content hash used for template identity. Identical input always yields the
/// same fixed-length lowercase hex digest, so a parent and an embedded child
/// that register the same template can be deduplicated after all files have
/// compiled.
pub fn content_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short prefix of the content hash, embedded in registration calls.
pub fn short_hash(source: &str) -> String {
    content_hash(source)[..12].to_string()
}
