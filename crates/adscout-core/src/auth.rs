//! API-key hashing.
//!
//! Raw keys are never stored; accounts carry only the salted SHA-256 digest,
//! so the same routine has to be used everywhere a key is issued or checked.

use sha2::{Digest, Sha256};

/// Salted SHA-256 digest of an API key, hex encoded (64 chars).
#[must_use]
pub fn hash_api_key(salt: &str, api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(api_key.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_salted() {
        let a = hash_api_key("salt-a", "key-1");
        let b = hash_api_key("salt-a", "key-1");
        let c = hash_api_key("salt-b", "key-1");
        let d = hash_api_key("salt-a", "key-2");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn hash_is_hex_encoded_sha256() {
        let digest = hash_api_key("salt", "key");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
