//! Endpoint configuration.

use cvq_core::SessionConfig;
use cvq_crypto::AuthenticatorConfig;
use serde::Deserialize;
use std::time::Duration;

/// Default listening / connecting address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
/// Default TCP port.
pub const DEFAULT_PORT: u16 = 8181;

/// Configuration of one Server or Client endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Address to bind (Server) or connect to (Client).
    pub address: String,
    /// TCP port.
    pub port: u16,
    /// Receive timeout in milliseconds; `None` blocks indefinitely.
    pub recv_timeout_ms: Option<u64>,
    /// Session policy.
    pub session: SessionConfig,
    /// Authentication backend.
    pub authentication: AuthenticatorConfig,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            recv_timeout_ms: None,
            session: SessionConfig::default(),
            authentication: AuthenticatorConfig::default(),
        }
    }
}

impl EndpointConfig {
    /// `address:port`, as accepted by tokio's socket constructors.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Receive timeout as a duration.
    pub fn recv_timeout(&self) -> Option<Duration> {
        self.recv_timeout_ms.map(Duration::from_millis)
    }
}
