//! Cryptographic primitives for the CV-QKD classical control channel.
//!
//! This crate implements the authentication building blocks used by the
//! control protocol:
//! - Message digest (SHA-256 over variable header and content)
//! - The [`Authenticator`] capability (`sign` / `verify`)
//! - Backends: no-op, ML-DSA-65 (FIPS 204) signatures, HMAC-SHA256
//! - A registry of named authenticator constructors
//!
//! Secret keys are held in `Zeroizing` wrappers and are never logged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod digest;
pub mod error;
pub mod mac;
pub mod mldsa;
pub mod registry;

pub use authenticator::{Authenticator, NoneAuthenticator};
pub use digest::{compute_digest, DIGEST_LEN};
pub use error::{Error, Result};
pub use registry::AuthenticatorConfig;
pub use mac::HmacAuthenticator;
pub use mldsa::{MlDsaAuthenticator, MlDsaKeyPair};
