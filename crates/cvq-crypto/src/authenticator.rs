//! The authenticator capability shared by every signature backend.

use crate::Result;
use subtle::ConstantTimeEq;

/// Signs outgoing digests and verifies signed digests from the peer.
///
/// Implementations must be deterministic in `verify`: the same
/// `(digest, signed_digest)` pair always yields the same answer.
pub trait Authenticator: Send + Sync {
    /// Registry name of this backend.
    fn name(&self) -> &'static str;

    /// Produce the signed digest placed on the wire.
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>>;

    /// Check a signed digest received from the peer against the locally
    /// recomputed digest.
    fn verify(&self, digest: &[u8], signed_digest: &[u8]) -> bool;
}

impl std::fmt::Debug for dyn Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("name", &self.name())
            .finish()
    }
}

/// No authentication: the signed digest is the digest itself.
///
/// Only detects accidental corruption; any party able to recompute a
/// SHA-256 can forge frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneAuthenticator;

impl Authenticator for NoneAuthenticator {
    fn name(&self) -> &'static str {
        "none"
    }

    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
        Ok(digest.to_vec())
    }

    fn verify(&self, digest: &[u8], signed_digest: &[u8]) -> bool {
        digest.len() == signed_digest.len() && bool::from(digest.ct_eq(signed_digest))
    }
}
