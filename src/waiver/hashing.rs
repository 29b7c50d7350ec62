use sha2::{Digest, Sha256};

/// Line endings folded to LF, outer whitespace trimmed. Idempotent.
pub fn canonicalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// Lowercase hex SHA-256 of the UTF-8 bytes.
pub fn fingerprint(canonical_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_text.as_bytes());
    hex::encode(hasher.finalize())
}
