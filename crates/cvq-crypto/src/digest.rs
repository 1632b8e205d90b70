//! Frame digest computation.
//!
//! The digest binds the serialized variable header and the content bytes
//! together so that neither the code, the challenges nor the payload can be
//! altered independently.

use sha2::{Digest, Sha256};

/// Digest length in bytes (SHA-256).
pub const DIGEST_LEN: usize = 32;

/// Compute `SHA-256(header_bytes || content_bytes)`.
pub fn compute_digest(header: &[u8], content: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(header);
    hasher.update(content);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_concatenation_hash() {
        let split = compute_digest(b"{\"code\":100}", b"{\"a\":1}");
        let joined = compute_digest(b"{\"code\":100}{\"a\":1}", b"");
        assert_eq!(split, joined);
    }

    #[test]
    fn test_digest_known_vector() {
        // SHA-256("abc")
        let digest = compute_digest(b"ab", b"c");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
