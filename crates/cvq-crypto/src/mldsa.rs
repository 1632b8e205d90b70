//! ML-DSA-65 (FIPS 204) post-quantum signature backend.
//!
//! The signed digest is a detached ML-DSA-65 signature over the 32-byte
//! frame digest. Each party signs with its own secret key and verifies with
//! the remote party's public key, so the two endpoints of a session carry
//! mirrored key material.
//!
//! # Example
//!
//! ```
//! use cvq_crypto::{Authenticator, MlDsaAuthenticator};
//!
//! # fn example() -> Result<(), cvq_crypto::Error> {
//! let alice = MlDsaAuthenticator::generate_keypair();
//! let bob = MlDsaAuthenticator::generate_keypair();
//!
//! let alice_auth = MlDsaAuthenticator::new(&alice.secret_key, &bob.public_key)?;
//! let bob_auth = MlDsaAuthenticator::new(&bob.secret_key, &alice.public_key)?;
//!
//! let digest = [7u8; 32];
//! let signed = alice_auth.sign(&digest)?;
//! assert!(bob_auth.verify(&digest, &signed));
//! # Ok(())
//! # }
//! ```

use crate::{Authenticator, Error, Result};
use ml_dsa::signature::{Signer as _, Verifier as _};
use ml_dsa::{
    EncodedSigningKey, EncodedVerifyingKey, KeyGen as _, MlDsa65, Signature, SigningKey,
    VerifyingKey,
};
use zeroize::Zeroizing;

/// Encoded ML-DSA-65 secret key length in bytes.
pub const SECRET_KEY_LEN: usize = 4032;
/// Encoded ML-DSA-65 public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 1952;
/// ML-DSA-65 signature length in bytes.
pub const SIGNATURE_LEN: usize = 3309;

/// A freshly generated ML-DSA-65 key pair in encoded form.
pub struct MlDsaKeyPair {
    /// Encoded secret key (4032 bytes), zeroed on drop.
    pub secret_key: Zeroizing<Vec<u8>>,
    /// Encoded public key (1952 bytes), to be handed to the remote party.
    pub public_key: Vec<u8>,
}

/// Authenticator signing with a local ML-DSA-65 secret key and verifying
/// with the remote party's public key.
pub struct MlDsaAuthenticator {
    /// Encoded local secret key, zeroed on drop.
    secret_key: Zeroizing<Vec<u8>>,
    /// Encoded remote public key.
    remote_public_key: Vec<u8>,
}

impl MlDsaAuthenticator {
    /// Build an authenticator from encoded key material.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLength` if either key does not have the
    /// ML-DSA-65 encoded length.
    pub fn new(secret_key: &[u8], remote_public_key: &[u8]) -> Result<Self> {
        if secret_key.len() != SECRET_KEY_LEN {
            return Err(Error::InvalidLength {
                expected: SECRET_KEY_LEN,
                actual: secret_key.len(),
            });
        }
        if remote_public_key.len() != PUBLIC_KEY_LEN {
            return Err(Error::InvalidLength {
                expected: PUBLIC_KEY_LEN,
                actual: remote_public_key.len(),
            });
        }

        Ok(Self {
            secret_key: Zeroizing::new(secret_key.to_vec()),
            remote_public_key: remote_public_key.to_vec(),
        })
    }

    /// Generate a new random ML-DSA-65 key pair using the OS RNG.
    pub fn generate_keypair() -> MlDsaKeyPair {
        let mut rng = rand::rngs::OsRng;
        let keypair = MlDsa65::key_gen(&mut rng);

        MlDsaKeyPair {
            secret_key: Zeroizing::new(keypair.signing_key().encode().as_slice().to_vec()),
            public_key: keypair.verifying_key().encode().as_slice().to_vec(),
        }
    }

    fn signing_key(&self) -> Result<SigningKey<MlDsa65>> {
        let encoded = EncodedSigningKey::<MlDsa65>::try_from(self.secret_key.as_slice())
            .map_err(|_| Error::InvalidPrivateKey("malformed ML-DSA-65 secret key".into()))?;
        Ok(SigningKey::<MlDsa65>::decode(&encoded))
    }

    fn verifying_key(&self) -> Option<VerifyingKey<MlDsa65>> {
        let encoded =
            EncodedVerifyingKey::<MlDsa65>::try_from(self.remote_public_key.as_slice()).ok()?;
        Some(VerifyingKey::<MlDsa65>::decode(&encoded))
    }
}

impl Authenticator for MlDsaAuthenticator {
    fn name(&self) -> &'static str {
        "ml-dsa-65"
    }

    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
        let signing_key = self.signing_key()?;
        let signature = signing_key
            .try_sign(digest)
            .map_err(|e| Error::Signing(e.to_string()))?;
        Ok(signature.encode().as_slice().to_vec())
    }

    fn verify(&self, digest: &[u8], signed_digest: &[u8]) -> bool {
        if signed_digest.len() != SIGNATURE_LEN {
            return false;
        }
        let Some(verifying_key) = self.verifying_key() else {
            tracing::warn!("Remote ML-DSA-65 public key could not be decoded");
            return false;
        };
        let Ok(signature) = Signature::<MlDsa65>::try_from(signed_digest) else {
            return false;
        };
        verifying_key.verify(digest, &signature).is_ok()
    }
}
