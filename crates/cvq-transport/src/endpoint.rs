//! Session endpoint: one authenticated protocol session over a byte stream.
//!
//! The endpoint owns the authentication context and the session state
//! machine of its connection; nothing is shared between endpoints. The
//! protocol is half-duplex: each `send` is answered by exactly one
//! message from the peer.
//!
//! Receive pipeline: read frame, verify signature and challenge, look up
//! the code, parse content, check phase legality, apply the transition.
//! A Server endpoint answers protocol errors itself (`UNKNOWN_COMMAND`,
//! `UNEXPECTED_COMMAND`, `INVALID_CONTENT`, `AUTHENTICATION_INVALID`) so
//! the Client always gets a reply; a Client endpoint only reports them.

use crate::codec::{read_frame, write_frame};
use crate::{EndpointConfig, Error, Result};
use cvq_core::auth::{AuthFailure, ChallengeSource};
use cvq_core::content::{decode_content, encode_content, CodeReport};
use cvq_core::{
    AuthContext, Code, Content, Frame, FrameIdentifier, Message, Payload, Role, SessionConfig,
    SessionPhase, SessionStateMachine,
};
use cvq_crypto::Authenticator;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

type CoreError = cvq_core::Error;

/// Protocol endpoint over a byte stream `T`.
///
/// # Example
///
/// ```no_run
/// use cvq_core::content::{IdentificationRequest, Payload};
/// use cvq_core::Code;
/// use cvq_transport::{connect, EndpointConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = connect(&EndpointConfig::default()).await?;
/// let request = IdentificationRequest::new("B1").to_content()?;
/// let reply = client.request(Code::IdentificationRequest, Some(&request)).await?;
/// assert_eq!(reply.code, Code::IdentificationResponse);
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct Endpoint<T> {
    io: Option<T>,
    auth: AuthContext,
    state: SessionStateMachine,
    max_content_length: u64,
    recv_timeout: Option<Duration>,
}

impl<T> std::fmt::Debug for Endpoint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("open", &self.io.is_some())
            .field("auth", &self.auth)
            .field("state", &self.state)
            .field("recv_timeout", &self.recv_timeout)
            .finish()
    }
}

impl<T> Endpoint<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream.
    pub fn new(
        io: T,
        role: Role,
        authenticator: Box<dyn Authenticator>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            io: Some(io),
            auth: AuthContext::new(authenticator, config),
            state: SessionStateMachine::new(role),
            max_content_length: config.max_content_length,
            recv_timeout: None,
        }
    }

    /// Wrap a connected stream, building the authenticator from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the authenticator cannot be built.
    pub fn from_config(io: T, role: Role, config: &EndpointConfig) -> Result<Self> {
        let authenticator = config
            .authentication
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self::new(io, role, authenticator, &config.session)
            .with_recv_timeout(config.recv_timeout()))
    }

    /// Set the receive timeout (`None` blocks indefinitely).
    pub fn with_recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Replace the challenge generator.
    pub fn with_challenge_source(mut self, source: impl ChallengeSource + 'static) -> Self {
        self.auth = self.auth.with_challenge_source(source);
        self
    }

    /// Local role.
    pub fn role(&self) -> Role {
        self.state.role()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// Active frame identifier.
    pub fn frame_id(&self) -> Option<FrameIdentifier> {
        self.state.frame_id()
    }

    /// Session state machine.
    pub fn state(&self) -> &SessionStateMachine {
        &self.state
    }

    /// Authentication context.
    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// True once the transport was shut down.
    pub fn is_closed(&self) -> bool {
        self.io.is_none()
    }

    /// Send `code` with optional `content`.
    ///
    /// The state transition is applied only once the frame was written.
    ///
    /// # Errors
    ///
    /// - [`cvq_core::Error::IllegalSend`] if our role may not send `code` now
    /// - [`cvq_core::Error::InvalidContent`] if `content` does not fit the code
    /// - [`Error::SocketDisconnection`] if the transport is gone
    pub async fn send(&mut self, code: Code, content: Option<&Content>) -> Result<()> {
        if self.io.is_none() {
            return Err(Error::SocketDisconnection);
        }
        let transition = self.state.check_outgoing(code, content)?;
        self.write_message(code, content).await?;
        self.state.apply(transition);
        Ok(())
    }

    /// Send `code` with a typed payload.
    pub async fn send_payload<P: Payload>(&mut self, code: Code, payload: &P) -> Result<()> {
        let content = payload.to_content().map_err(|e| CoreError::InvalidContent {
            code,
            reason: e.to_string(),
        })?;
        self.send(code, Some(&content)).await
    }

    /// Receive the next message.
    ///
    /// # Errors
    ///
    /// Every error maps to a sentinel through [`Error::code`]. Frame errors
    /// are never answered; other protocol errors are answered by a Server
    /// endpoint before being returned. Reaching the authentication failure
    /// threshold closes the endpoint.
    pub async fn recv(&mut self) -> Result<Message> {
        let frame = match self.read().await {
            Ok(frame) => frame,
            Err(e) => {
                match &e {
                    Error::SocketDisconnection => tracing::info!("Peer disconnected"),
                    Error::Timeout(limit) => tracing::warn!("No frame within {:?}", limit),
                    other => tracing::warn!("Dropping unreadable frame: {}", other),
                }
                return Err(e);
            }
        };

        if let Err(failure) = self.auth.verify_incoming(&frame) {
            return Err(self.authentication_failed(failure).await);
        }

        let value = frame.code();
        let Some(code) = Code::from_u8(value) else {
            tracing::warn!("Received unknown code {}", value);
            self.reply_report(Code::UnknownCommand, value).await;
            return Err(CoreError::UnknownCode(value).into());
        };

        let content = match decode_content(&frame.content) {
            Ok(content) => content,
            Err(e) => {
                let error = CoreError::InvalidContent {
                    code,
                    reason: e.to_string(),
                };
                tracing::warn!("{}", error);
                self.reply(Code::InvalidContent, None).await;
                return Err(error.into());
            }
        };

        match self.state.check_incoming(code, content.as_ref()) {
            Ok(transition) => {
                self.state.apply(transition);
                tracing::info!(
                    "Received {} ({} content bytes)",
                    code,
                    frame.content.len()
                );
                Ok(Message { code, content })
            }
            Err(error) => {
                tracing::warn!("Rejected {}: {}", code, error);
                match &error {
                    CoreError::UnexpectedCode { .. } => {
                        self.reply_report(Code::UnexpectedCommand, value).await
                    }
                    CoreError::InvalidContent { .. } => self.reply(Code::InvalidContent, None).await,
                    _ => {}
                }
                Err(error.into())
            }
        }
    }

    /// Send a request and wait for its answer (Client only).
    pub async fn request(&mut self, code: Code, content: Option<&Content>) -> Result<Message> {
        if self.role() != Role::Client {
            return Err(CoreError::InvalidState("only the client issues requests".into()).into());
        }
        self.send(code, content).await?;
        self.recv().await
    }

    /// Graceful disconnection (Client only): send `DISCONNECTION`, wait for
    /// `DISCONNECTION_ACK`, close the transport.
    ///
    /// The transport is closed even if the acknowledgement never arrives.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.send(Code::Disconnection, None).await?;
        let reply = self.recv().await;
        self.close().await?;
        match reply {
            Ok(message) if message.code == Code::DisconnectionAck => Ok(()),
            Ok(message) => Err(CoreError::UnexpectedCode {
                code: message.code,
                phase: self.phase(),
            }
            .into()),
            // The peer may close before acknowledging.
            Err(Error::SocketDisconnection) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Shut the transport down. Later operations yield
    /// [`Error::SocketDisconnection`].
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut io) = self.io.take() {
            tracing::debug!("Closing transport");
            match io.shutdown().await {
                Ok(()) => {}
                Err(e) => match Error::from(e) {
                    Error::SocketDisconnection => {}
                    other => return Err(other),
                },
            }
        }
        Ok(())
    }

    // === Helper functions ===

    async fn read(&mut self) -> Result<Frame> {
        let limit = self.max_content_length;
        let io = self.io.as_mut().ok_or(Error::SocketDisconnection)?;
        match self.recv_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, read_frame(io, limit)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(timeout)),
            },
            None => read_frame(io, limit).await,
        }
    }

    async fn write_message(&mut self, code: Code, content: Option<&Content>) -> Result<()> {
        let bytes = encode_content(content).map_err(|e| CoreError::InvalidContent {
            code,
            reason: e.to_string(),
        })?;
        let content_length = bytes.len();
        let frame = self.auth.seal(code, bytes)?;
        let io = self.io.as_mut().ok_or(Error::SocketDisconnection)?;
        write_frame(io, &frame).await?;
        self.auth.commit(&frame);
        tracing::info!("Sent {} ({} content bytes)", code, content_length);
        Ok(())
    }

    /// Automatic reply; Server role only, best effort.
    async fn reply(&mut self, code: Code, content: Option<&Content>) {
        if self.role() != Role::Server {
            return;
        }
        if let Err(e) = self.send(code, content).await {
            tracing::warn!("Could not send {}: {}", code, e);
        }
    }

    async fn reply_report(&mut self, code: Code, offending: u8) {
        match (CodeReport { code: offending }).to_content() {
            Ok(content) => self.reply(code, Some(&content)).await,
            Err(e) => tracing::warn!("Could not build {} content: {}", code, e),
        }
    }

    async fn authentication_failed(&mut self, failure: AuthFailure) -> Error {
        if !self.auth.is_exhausted() {
            self.reply(Code::AuthenticationInvalid, None).await;
            return CoreError::Authentication(failure).into();
        }

        let failures = self.auth.consecutive_failures();
        tracing::error!(
            "{} consecutive authentication failures, terminating session",
            failures
        );
        if self.role() == Role::Client {
            if let Err(e) = self.write_message(Code::Disconnection, None).await {
                tracing::debug!("Disconnection notice not delivered: {}", e);
            }
        }
        self.state.abort_frame();
        if let Err(e) = self.close().await {
            tracing::debug!("Close after fatal failure: {}", e);
        }
        CoreError::AuthenticationExhausted { failures }.into()
    }
}
