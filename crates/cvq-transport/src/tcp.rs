//! TCP listener and connector.
//!
//! Every accepted connection gets its own [`Endpoint`] with an independent
//! authentication context and session state.

use crate::{Endpoint, EndpointConfig, Error, Result};
use cvq_core::Role;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

/// Listening Server socket.
#[derive(Debug)]
pub struct TcpServer {
    listener: TcpListener,
    config: EndpointConfig,
}

impl TcpServer {
    /// Bind to `config.address:config.port` (port 0 picks a free port).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the authenticator configuration is
    /// unusable, [`Error::ConnectionFailed`] if binding fails.
    pub async fn bind(config: &EndpointConfig) -> Result<Self> {
        // Fail before accepting anyone if the backend cannot be built.
        config
            .authentication
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let listener = TcpListener::bind(config.socket_addr())
            .await
            .map_err(|e| Error::ConnectionFailed(format!("Bind failed: {}", e)))?;
        tracing::info!(
            "Listening on {} ({} authentication)",
            config.socket_addr(),
            config.authentication.class
        );
        Ok(Self {
            listener,
            config: config.clone(),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| Error::ConnectionFailed(format!("No local address: {}", e)))
    }

    /// Wait for the next Client and wrap the connection in a Server endpoint.
    pub async fn accept(&self) -> Result<Endpoint<TcpStream>> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| Error::ConnectionFailed(format!("Accept failed: {}", e)))?;
        stream.set_nodelay(true)?;
        tracing::info!("Accepted connection from {}", peer);
        Endpoint::from_config(stream, Role::Server, &self.config)
    }
}

/// Connect to the Server at `config.address:config.port` as a Client.
///
/// # Errors
///
/// Returns [`Error::Config`] if the authenticator configuration is
/// unusable, [`Error::ConnectionFailed`] if the connection is refused.
pub async fn connect(config: &EndpointConfig) -> Result<Endpoint<TcpStream>> {
    let authenticator = config
        .authentication
        .build()
        .map_err(|e| Error::Config(e.to_string()))?;
    let addr = config.socket_addr();
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|e| Error::ConnectionFailed(format!("Connect to {} failed: {}", addr, e)))?;
    stream.set_nodelay(true)?;
    tracing::info!("Connected to {}", addr);
    Ok(
        Endpoint::new(stream, Role::Client, authenticator, &config.session)
            .with_recv_timeout(config.recv_timeout()),
    )
}
