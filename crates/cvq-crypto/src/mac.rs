//! HMAC-SHA256 symmetric backend.
//!
//! Both parties share the same key; the signed digest is
//! `HMAC-SHA256(key, digest)`. Verification is constant-time.

use crate::{Authenticator, Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted shared key length in bytes.
pub const MIN_KEY_LEN: usize = 32;

/// Tag length in bytes.
pub const TAG_LEN: usize = 32;

/// Authenticator using a pre-shared HMAC-SHA256 key.
pub struct HmacAuthenticator {
    key: Zeroizing<Vec<u8>>,
}

impl HmacAuthenticator {
    /// Build an authenticator from a shared key of at least 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() < MIN_KEY_LEN {
            return Err(Error::InvalidLength {
                expected: MIN_KEY_LEN,
                actual: key.len(),
            });
        }
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
        })
    }

    fn mac(&self) -> Result<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(&self.key).map_err(|e| Error::Signing(e.to_string()))
    }
}

impl Authenticator for HmacAuthenticator {
    fn name(&self) -> &'static str {
        "hmac-sha256"
    }

    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(digest);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify(&self, digest: &[u8], signed_digest: &[u8]) -> bool {
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(digest);
        mac.verify_slice(signed_digest).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sign_verify() {
        let auth = HmacAuthenticator::new(&[0x0b; 32]).unwrap();
        let tag = auth.sign(b"Hi There").unwrap();
        assert_eq!(tag.len(), TAG_LEN);
        assert!(auth.verify(b"Hi There", &tag));
    }

    #[test]
    fn test_hmac_rejects_tamper_and_wrong_key() {
        let auth = HmacAuthenticator::new(&[0x42; 32]).unwrap();
        let other = HmacAuthenticator::new(&[0x43; 32]).unwrap();
        let tag = auth.sign(&[1u8; 32]).unwrap();

        assert!(!auth.verify(&[2u8; 32], &tag));
        assert!(!other.verify(&[1u8; 32], &tag));

        let mut bad = tag.clone();
        bad[TAG_LEN - 1] ^= 0x01;
        assert!(!auth.verify(&[1u8; 32], &bad));
    }

    #[test]
    fn test_hmac_short_key_rejected() {
        assert!(matches!(
            HmacAuthenticator::new(&[0u8; 16]),
            Err(Error::InvalidLength { expected: MIN_KEY_LEN, actual: 16 })
        ));
    }
}
