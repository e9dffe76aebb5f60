use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256, used for source-file digests and dedupe fingerprints.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
