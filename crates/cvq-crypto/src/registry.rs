//! Registry of named authenticator constructors.
//!
//! Deployments select the authentication backend by name in their
//! configuration; the registry maps that name to a constructor taking the
//! backend parameters. Key material is passed hex encoded.

use crate::{Authenticator, Error, HmacAuthenticator, MlDsaAuthenticator, NoneAuthenticator, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Authenticator parameters (string map, binary values hex encoded).
pub type AuthenticatorParams = BTreeMap<String, String>;

/// Constructor signature shared by every registered backend.
pub type Constructor = fn(&AuthenticatorParams) -> Result<Box<dyn Authenticator>>;

/// Default backend name.
pub const DEFAULT_CLASS: &str = "none";

/// Registered backends, by name.
const REGISTRY: &[(&str, Constructor)] = &[
    ("none", build_none),
    ("ml-dsa-65", build_ml_dsa),
    ("hmac-sha256", build_hmac),
];

/// Authentication section of an endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthenticatorConfig {
    /// Registry name of the backend.
    pub class: String,
    /// Backend parameters.
    pub params: AuthenticatorParams,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            class: DEFAULT_CLASS.to_string(),
            params: AuthenticatorParams::new(),
        }
    }
}

impl AuthenticatorConfig {
    /// Instantiate the configured backend.
    pub fn build(&self) -> Result<Box<dyn Authenticator>> {
        build(&self.class, &self.params)
    }
}

/// Names of all registered backends.
pub fn registered() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// Look up `class` in the registry and construct it with `params`.
pub fn build(class: &str, params: &AuthenticatorParams) -> Result<Box<dyn Authenticator>> {
    let constructor = REGISTRY
        .iter()
        .find(|(name, _)| *name == class)
        .map(|(_, constructor)| *constructor)
        .ok_or_else(|| Error::Config(format!("unknown authenticator class '{}'", class)))?;

    tracing::debug!(class, "Building authenticator");
    constructor(params)
}

fn build_none(_params: &AuthenticatorParams) -> Result<Box<dyn Authenticator>> {
    Ok(Box::new(NoneAuthenticator))
}

fn build_ml_dsa(params: &AuthenticatorParams) -> Result<Box<dyn Authenticator>> {
    let secret_key = hex_param(params, "secret_key")?;
    let remote_public_key = hex_param(params, "remote_public_key")?;
    let authenticator = MlDsaAuthenticator::new(&secret_key, &remote_public_key)
        .map_err(|e| Error::Config(format!("ml-dsa-65: {}", e)))?;
    Ok(Box::new(authenticator))
}

fn build_hmac(params: &AuthenticatorParams) -> Result<Box<dyn Authenticator>> {
    let key = hex_param(params, "key")?;
    let authenticator =
        HmacAuthenticator::new(&key).map_err(|e| Error::Config(format!("hmac-sha256: {}", e)))?;
    Ok(Box::new(authenticator))
}

fn hex_param(params: &AuthenticatorParams, key: &str) -> Result<zeroize::Zeroizing<Vec<u8>>> {
    let value = params
        .get(key)
        .ok_or_else(|| Error::Config(format!("missing parameter '{}'", key)))?;
    hex::decode(value.trim())
        .map(zeroize::Zeroizing::new)
        .map_err(|e| Error::Config(format!("parameter '{}' is not valid hex: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_none() {
        let auth = AuthenticatorConfig::default().build().unwrap();
        assert_eq!(auth.name(), "none");
    }

    #[test]
    fn test_registered_names() {
        let names: Vec<_> = registered().collect();
        assert_eq!(names, vec!["none", "ml-dsa-65", "hmac-sha256"]);
    }

    #[test]
    fn test_unknown_class() {
        let err = build("falcon-512", &AuthenticatorParams::new()).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("falcon-512")));
    }

    #[test]
    fn test_hmac_from_params() {
        let mut params = AuthenticatorParams::new();
        params.insert("key".into(), hex::encode([0x11u8; 32]));
        let auth = build("hmac-sha256", &params).unwrap();
        assert_eq!(auth.name(), "hmac-sha256");
        let tag = auth.sign(&[0u8; 32]).unwrap();
        assert!(auth.verify(&[0u8; 32], &tag));
    }

    #[test]
    fn test_missing_and_malformed_params() {
        let err = build("hmac-sha256", &AuthenticatorParams::new()).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("missing parameter 'key'")));

        let mut params = AuthenticatorParams::new();
        params.insert("key".into(), "not-hex".into());
        assert!(matches!(build("hmac-sha256", &params), Err(Error::Config(_))));

        params.insert("key".into(), hex::encode([0u8; 8]));
        assert!(matches!(build("hmac-sha256", &params), Err(Error::Config(_))));
    }

    #[test]
    fn test_ml_dsa_from_params() {
        let local = MlDsaAuthenticator::generate_keypair();
        let remote = MlDsaAuthenticator::generate_keypair();

        let mut params = AuthenticatorParams::new();
        params.insert("secret_key".into(), hex::encode(&*local.secret_key));
        params.insert("remote_public_key".into(), hex::encode(&remote.public_key));

        let auth = build("ml-dsa-65", &params).unwrap();
        assert_eq!(auth.name(), "ml-dsa-65");
    }

    #[test]
    fn test_config_deserializes() {
        let config: AuthenticatorConfig = serde_json::from_str(
            r#"{"class": "hmac-sha256", "params": {"key": "00"}}"#,
        )
        .unwrap();
        assert_eq!(config.class, "hmac-sha256");
        assert_eq!(config.params.get("key").map(String::as_str), Some("00"));

        let empty: AuthenticatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, AuthenticatorConfig::default());
    }
}
