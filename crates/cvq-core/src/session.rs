//! Session phases and the state machine governing code legality.
//!
//! Every phase has an enumerable set of codes each role may send. The
//! catalog category of a code is necessary but not sufficient: a
//! `QIE_REQUEST` is a quantum exchange code, yet it is illegal until the
//! Server has accepted the frame initialization.
//!
//! Validation and mutation are split. [`SessionStateMachine::check_outgoing`]
//! and [`SessionStateMachine::check_incoming`] return a [`Transition`]
//! without touching the state; the endpoint applies it with
//! [`SessionStateMachine::apply`] once the frame was written or verified.

use crate::codes::{Category, Code, ContentShape};
use crate::content::{Content, InitializationRequest, Payload};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of consecutive authentication failures tolerated.
pub const DEFAULT_MAX_FAILURES: u32 = 3;
/// Default challenge length (alphanumeric characters).
pub const DEFAULT_CHALLENGE_LENGTH: usize = 32;
/// Default upper bound on a declared content length (64 MiB).
pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 64 * 1024 * 1024;

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Consecutive authentication failures after which the session is
    /// considered compromised.
    pub max_failures: u32,
    /// Length of generated challenges.
    pub challenge_length: usize,
    /// Largest content length accepted from the peer.
    pub max_content_length: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            challenge_length: DEFAULT_CHALLENGE_LENGTH,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// Session role (Client or Server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Active peer: initiates every phase transition.
    Client,
    /// Passive peer: only answers.
    Server,
}

impl Role {
    /// The other role.
    pub fn peer(self) -> Self {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }
}

/// Protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Peers identify each other (initial phase).
    Identification,
    /// A frame is being negotiated.
    Initialization,
    /// Quantum information exchange.
    QuantumExchange,
    /// Parameter estimation.
    ParameterEstimation,
    /// Error correction.
    ErrorCorrection,
    /// Privacy amplification.
    PrivacyAmplification,
    /// The frame is being closed; a new one may start.
    FrameTermination,
    /// The frame was abandoned; a new one may start.
    Aborted,
    /// Graceful disconnection requested.
    Disconnected,
}

/// Identifier of one key distribution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameIdentifier(Uuid);

impl FrameIdentifier {
    /// Fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FrameIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FrameIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Whether `sender` may emit `code` while the session is in `phase`.
pub fn permits(phase: SessionPhase, sender: Role, code: Code) -> bool {
    use Code::*;

    if phase == SessionPhase::Disconnected {
        return sender == Role::Server && code == DisconnectionAck;
    }

    let interrupt = match (sender, code.category()) {
        (_, Category::Generic) => true,
        (Role::Client, Category::ParameterChange) => code == ChangeParameterRequest,
        (Role::Server, Category::ParameterChange) => code != ChangeParameterRequest,
        (Role::Client, Category::PolarisationRecovery) => {
            phase != SessionPhase::Identification
                && matches!(code, RequestPolarisationRecovery | EndPolarisationRecovery)
        }
        (Role::Server, Category::PolarisationRecovery) => {
            phase != SessionPhase::Identification
                && matches!(code, PolarisationRecoveryAck | PolarisationRecoveryEnded)
        }
        (Role::Client, _) => matches!(code, IdentificationRequest | Disconnection),
        (Role::Server, _) => false,
    };
    if interrupt {
        return true;
    }

    let legal: &[Code] = match (phase, sender) {
        (SessionPhase::Identification, Role::Client) => &[IdentificationRequest],
        (SessionPhase::Identification, Role::Server) => {
            &[IdentificationResponse, InvalidQosstVersion]
        }
        (SessionPhase::Initialization, Role::Client) => {
            &[InitializationRequest, InitializationRequestConfig]
        }
        (SessionPhase::Initialization, Role::Server) => &[
            InitializationAccepted,
            InitializationDenied,
            InitializationProposal,
            InitializationConfig,
        ],
        (SessionPhase::QuantumExchange, Role::Client) => {
            &[QieRequest, QieTrigger, QieAcquisitionEnded]
        }
        (SessionPhase::QuantumExchange, Role::Server) => {
            &[QieReady, QieEmissionStarted, QieEnded]
        }
        (SessionPhase::ParameterEstimation, Role::Client) => {
            &[PeSymbolsRequest, PeNphotonRequest, PeFinished]
        }
        (SessionPhase::ParameterEstimation, Role::Server) => &[
            PeSymbolsResponse,
            PeSymbolsError,
            PeNphotonResponse,
            PeApproved,
            PeDenied,
        ],
        (SessionPhase::ErrorCorrection, Role::Client) => {
            &[EcInitialization, EcBlock, EcRemaining, EcVerification]
        }
        (SessionPhase::ErrorCorrection, Role::Server) => &[
            EcReady,
            EcDenied,
            EcBlockAck,
            EcBlockError,
            EcRemainingAck,
            EcRemainingError,
            EcVerificationSuccess,
            EcVerificationFail,
        ],
        (SessionPhase::PrivacyAmplification, Role::Client) => &[PaRequest],
        (SessionPhase::PrivacyAmplification, Role::Server) => &[PaSuccess, PaError],
        (SessionPhase::FrameTermination, Role::Client) => &[FrameEnded, InitializationRequest],
        (SessionPhase::FrameTermination, Role::Server) => &[FrameEndedAck],
        (SessionPhase::Aborted, Role::Client) => &[InitializationRequest],
        (SessionPhase::Aborted, Role::Server) => &[],
        (SessionPhase::Disconnected, _) => &[],
    };
    legal.contains(&code)
}

/// A validated, not yet applied, state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Transition {
    code: Code,
    frame: Option<FrameIdentifier>,
}

impl Transition {
    /// Code driving the transition.
    pub fn code(&self) -> Code {
        self.code
    }
}

/// Phase and frame bookkeeping for one session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    role: Role,
    phase: SessionPhase,
    frame_id: Option<FrameIdentifier>,
    pending_frame: Option<FrameIdentifier>,
    resume: Option<SessionPhase>,
}

impl SessionStateMachine {
    /// New session in the Identification phase.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            phase: SessionPhase::Identification,
            frame_id: None,
            pending_frame: None,
            resume: None,
        }
    }

    /// Local role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Active frame identifier.
    pub fn frame_id(&self) -> Option<FrameIdentifier> {
        self.frame_id
    }

    /// Frame identifier proposed but not yet accepted.
    pub fn pending_frame(&self) -> Option<FrameIdentifier> {
        self.pending_frame
    }

    /// Phase to return to once re-identification completes.
    pub fn resume_phase(&self) -> Option<SessionPhase> {
        self.resume
    }

    /// Whether `sender` may emit `code` now.
    pub fn permits(&self, sender: Role, code: Code) -> bool {
        permits(self.phase, sender, code)
    }

    /// Validate a message we are about to send.
    pub fn check_outgoing(&self, code: Code, content: Option<&Content>) -> Result<Transition> {
        if !self.permits(self.role, code) {
            return Err(Error::IllegalSend {
                code,
                role: self.role,
                phase: self.phase,
            });
        }
        match (code.content_shape(), content) {
            (ContentShape::Required, None) => {
                return Err(invalid_content(code, "content is required"))
            }
            (ContentShape::Empty, Some(_)) => {
                return Err(invalid_content(code, "code carries no content"))
            }
            _ => {}
        }
        self.transition(code, content)
    }

    /// Validate a message received from the peer.
    ///
    /// Content attached to a code that carries none is ignored.
    pub fn check_incoming(&self, code: Code, content: Option<&Content>) -> Result<Transition> {
        if !self.permits(self.role.peer(), code) {
            return Err(Error::UnexpectedCode {
                code,
                phase: self.phase,
            });
        }
        if code.content_shape() == ContentShape::Required && content.is_none() {
            return Err(invalid_content(code, "content is required"));
        }
        self.transition(code, content)
    }

    fn transition(&self, code: Code, content: Option<&Content>) -> Result<Transition> {
        let frame = if code == Code::InitializationRequest {
            let content = content.ok_or_else(|| invalid_content(code, "content is required"))?;
            let request = InitializationRequest::from_content(content)
                .map_err(|e| invalid_content(code, e.0))?;
            Some(request.frame_uuid)
        } else {
            None
        };
        Ok(Transition { code, frame })
    }

    /// Apply a validated transition.
    pub fn apply(&mut self, transition: Transition) {
        let before = self.phase;
        match transition.code {
            Code::IdentificationRequest | Code::AuthenticationInvalid => {
                if self.phase != SessionPhase::Identification {
                    self.resume = Some(self.phase);
                }
                self.phase = SessionPhase::Identification;
            }
            Code::IdentificationResponse => {
                self.phase = self.resume.take().unwrap_or(SessionPhase::Initialization);
            }
            Code::InitializationRequest => {
                self.frame_id = None;
                self.pending_frame = transition.frame;
                self.phase = SessionPhase::Initialization;
            }
            Code::InitializationAccepted => {
                self.frame_id = self.pending_frame.take();
                self.phase = SessionPhase::QuantumExchange;
            }
            Code::InitializationDenied => self.pending_frame = None,
            Code::QieEnded => self.phase = SessionPhase::ParameterEstimation,
            Code::PeApproved => self.phase = SessionPhase::ErrorCorrection,
            Code::EcVerificationSuccess => self.phase = SessionPhase::PrivacyAmplification,
            Code::PaSuccess => self.phase = SessionPhase::FrameTermination,
            Code::FrameEndedAck => self.frame_id = None,
            // Leaving Identification takes a successful identification.
            Code::Abort if self.phase == SessionPhase::Identification => self.clear_frame(),
            Code::Abort
            | Code::PeDenied
            | Code::EcDenied
            | Code::EcVerificationFail
            | Code::PaError => self.abort_frame(),
            Code::Disconnection => {
                self.clear_frame();
                self.phase = SessionPhase::Disconnected;
            }
            _ => {}
        }
        if self.phase != before {
            tracing::debug!(
                "Session phase {:?} -> {:?} on {}",
                before,
                self.phase,
                transition.code
            );
        }
    }

    /// Discard all in-progress frame state and move to Aborted.
    pub fn abort_frame(&mut self) {
        self.clear_frame();
        self.phase = SessionPhase::Aborted;
    }

    fn clear_frame(&mut self) {
        self.frame_id = None;
        self.pending_frame = None;
        self.resume = None;
    }
}

fn invalid_content(code: Code, reason: impl Into<String>) -> Error {
    Error::InvalidContent {
        code,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CATALOG;
    use crate::content::IdentificationResponse;

    fn identification() -> Content {
        crate::content::IdentificationRequest::new("B1")
            .to_content()
            .expect("content failed")
    }

    fn init_request(frame: FrameIdentifier) -> Content {
        InitializationRequest {
            frame_uuid: frame,
            parameters: Content::new(),
        }
        .to_content()
        .expect("content failed")
    }

    /// Drive the same exchange through a client and a server machine.
    fn exchange(
        client: &mut SessionStateMachine,
        server: &mut SessionStateMachine,
        sender: Role,
        code: Code,
        content: Option<&Content>,
    ) {
        let (local, remote) = match sender {
            Role::Client => (client, server),
            Role::Server => (server, client),
        };
        let sent = local.check_outgoing(code, content).expect("send check failed");
        let received = remote
            .check_incoming(code, content)
            .expect("receive check failed");
        local.apply(sent);
        remote.apply(received);
    }

    fn identified() -> (SessionStateMachine, SessionStateMachine) {
        let mut client = SessionStateMachine::new(Role::Client);
        let mut server = SessionStateMachine::new(Role::Server);
        let response = IdentificationResponse {
            serial_number: "A1".into(),
        }
        .to_content()
        .expect("content failed");
        exchange(
            &mut client,
            &mut server,
            Role::Client,
            Code::IdentificationRequest,
            Some(&identification()),
        );
        exchange(
            &mut client,
            &mut server,
            Role::Server,
            Code::IdentificationResponse,
            Some(&response),
        );
        (client, server)
    }

    #[test]
    fn test_initial_state() {
        let machine = SessionStateMachine::new(Role::Server);
        assert_eq!(machine.phase(), SessionPhase::Identification);
        assert_eq!(machine.frame_id(), None);
    }

    #[test]
    fn test_qie_request_before_initialization_is_unexpected() {
        let server = SessionStateMachine::new(Role::Server);
        let result = server.check_incoming(Code::QieRequest, None);
        assert!(matches!(
            result,
            Err(Error::UnexpectedCode {
                code: Code::QieRequest,
                phase: SessionPhase::Identification
            })
        ));
        assert_eq!(server.phase(), SessionPhase::Identification);

        let (_, server) = identified();
        assert!(server.check_incoming(Code::QieRequest, None).is_err());
    }

    #[test]
    fn test_full_cycle() {
        let (mut client, mut server) = identified();
        assert_eq!(client.phase(), SessionPhase::Initialization);
        assert_eq!(server.phase(), SessionPhase::Initialization);

        let frame = FrameIdentifier::new();
        let request = init_request(frame);
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&request));
        assert_eq!(server.pending_frame(), Some(frame));
        assert_eq!(server.frame_id(), None);
        exchange(&mut client, &mut server, Role::Server, Code::InitializationAccepted, None);
        assert_eq!(client.phase(), SessionPhase::QuantumExchange);
        assert_eq!(client.frame_id(), Some(frame));
        assert_eq!(server.frame_id(), Some(frame));

        for (sender, code) in [
            (Role::Client, Code::QieRequest),
            (Role::Server, Code::QieReady),
            (Role::Client, Code::QieTrigger),
            (Role::Server, Code::QieEmissionStarted),
            (Role::Client, Code::QieAcquisitionEnded),
            (Role::Server, Code::QieEnded),
        ] {
            exchange(&mut client, &mut server, sender, code, None);
        }
        assert_eq!(server.phase(), SessionPhase::ParameterEstimation);

        let mut finished = Content::new();
        finished.insert("n_symbols".into(), 1000.into());
        exchange(&mut client, &mut server, Role::Client, Code::PeFinished, Some(&finished));
        exchange(&mut client, &mut server, Role::Server, Code::PeApproved, None);
        assert_eq!(client.phase(), SessionPhase::ErrorCorrection);

        let mut block = Content::new();
        block.insert("block".into(), 0.into());
        exchange(&mut client, &mut server, Role::Client, Code::EcInitialization, None);
        exchange(&mut client, &mut server, Role::Server, Code::EcReady, None);
        exchange(&mut client, &mut server, Role::Client, Code::EcBlock, Some(&block));
        exchange(&mut client, &mut server, Role::Server, Code::EcBlockAck, None);
        exchange(&mut client, &mut server, Role::Client, Code::EcVerification, Some(&block));
        exchange(&mut client, &mut server, Role::Server, Code::EcVerificationSuccess, None);
        assert_eq!(server.phase(), SessionPhase::PrivacyAmplification);

        exchange(&mut client, &mut server, Role::Client, Code::PaRequest, None);
        exchange(&mut client, &mut server, Role::Server, Code::PaSuccess, None);
        assert_eq!(client.phase(), SessionPhase::FrameTermination);
        assert_eq!(client.frame_id(), Some(frame));

        exchange(&mut client, &mut server, Role::Client, Code::FrameEnded, None);
        exchange(&mut client, &mut server, Role::Server, Code::FrameEndedAck, None);
        assert_eq!(client.frame_id(), None);
        assert_eq!(server.frame_id(), None);

        // A new frame may begin straight from frame termination.
        let next = FrameIdentifier::new();
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(next)));
        assert_eq!(server.phase(), SessionPhase::Initialization);
        assert_eq!(server.pending_frame(), Some(next));

        exchange(&mut client, &mut server, Role::Client, Code::Disconnection, None);
        assert_eq!(server.phase(), SessionPhase::Disconnected);
        exchange(&mut client, &mut server, Role::Server, Code::DisconnectionAck, None);
        assert_eq!(client.phase(), SessionPhase::Disconnected);
    }

    #[test]
    fn test_abort_discards_frame() {
        let (mut client, mut server) = identified();
        let frame = FrameIdentifier::new();
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(frame)));
        exchange(&mut client, &mut server, Role::Server, Code::InitializationAccepted, None);

        exchange(&mut client, &mut server, Role::Client, Code::Abort, None);
        assert_eq!(server.phase(), SessionPhase::Aborted);
        assert_eq!(server.frame_id(), None);
        exchange(&mut client, &mut server, Role::Server, Code::AbortAck, None);
        assert_eq!(client.phase(), SessionPhase::Aborted);
        assert_eq!(client.frame_id(), None);

        assert!(client.check_outgoing(Code::QieRequest, None).is_err());
        let retry = FrameIdentifier::new();
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(retry)));
        assert_eq!(client.phase(), SessionPhase::Initialization);
    }

    #[test]
    fn test_abort_during_identification_keeps_phase() {
        let mut client = SessionStateMachine::new(Role::Client);
        let mut server = SessionStateMachine::new(Role::Server);
        exchange(&mut client, &mut server, Role::Client, Code::IdentificationRequest, Some(&identification()));
        exchange(&mut client, &mut server, Role::Server, Code::InvalidQosstVersion, None);
        exchange(&mut client, &mut server, Role::Client, Code::Abort, None);
        exchange(&mut client, &mut server, Role::Server, Code::AbortAck, None);
        assert_eq!(client.phase(), SessionPhase::Identification);
        assert_eq!(server.phase(), SessionPhase::Identification);

        let request = init_request(FrameIdentifier::new());
        assert!(matches!(
            client.check_outgoing(Code::InitializationRequest, Some(&request)),
            Err(Error::IllegalSend { .. })
        ));
        assert!(matches!(
            server.check_incoming(Code::InitializationRequest, Some(&request)),
            Err(Error::UnexpectedCode { .. })
        ));
    }

    #[test]
    fn test_abort_during_reidentification_requires_identification() {
        let (mut client, mut server) = identified();
        let frame = FrameIdentifier::new();
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(frame)));
        exchange(&mut client, &mut server, Role::Server, Code::InitializationAccepted, None);
        exchange(&mut client, &mut server, Role::Server, Code::AuthenticationInvalid, None);

        exchange(&mut client, &mut server, Role::Client, Code::Abort, None);
        exchange(&mut client, &mut server, Role::Server, Code::AbortAck, None);
        assert_eq!(server.phase(), SessionPhase::Identification);
        assert_eq!(server.frame_id(), None);
        assert_eq!(server.resume_phase(), None);
        assert!(server
            .check_incoming(Code::InitializationRequest, Some(&init_request(FrameIdentifier::new())))
            .is_err());

        let response = IdentificationResponse {
            serial_number: "A1".into(),
        }
        .to_content()
        .expect("content failed");
        exchange(&mut client, &mut server, Role::Client, Code::IdentificationRequest, Some(&identification()));
        exchange(&mut client, &mut server, Role::Server, Code::IdentificationResponse, Some(&response));
        assert_eq!(client.phase(), SessionPhase::Initialization);
        assert_eq!(server.phase(), SessionPhase::Initialization);
    }

    #[test]
    fn test_new_frame_from_termination_drops_old_identifier() {
        let (mut client, mut server) = identified();
        let old = FrameIdentifier::new();
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(old)));
        exchange(&mut client, &mut server, Role::Server, Code::InitializationAccepted, None);
        for code in [
            Code::QieEnded,
            Code::PeApproved,
            Code::EcVerificationSuccess,
            Code::PaSuccess,
        ] {
            exchange(&mut client, &mut server, Role::Server, code, None);
        }
        assert_eq!(server.phase(), SessionPhase::FrameTermination);
        assert_eq!(server.frame_id(), Some(old));

        // No FRAME_ENDED: the next request replaces the finished frame.
        let next = FrameIdentifier::new();
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(next)));
        assert_eq!(server.frame_id(), None);
        assert_eq!(server.pending_frame(), Some(next));

        exchange(&mut client, &mut server, Role::Server, Code::InitializationDenied, None);
        assert_eq!(server.phase(), SessionPhase::Initialization);
        assert_eq!(server.frame_id(), None);
        assert_eq!(client.frame_id(), None);
    }

    #[test]
    fn test_denied_paths_abort() {
        let (mut client, mut server) = identified();
        let frame = FrameIdentifier::new();
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(frame)));
        exchange(&mut client, &mut server, Role::Server, Code::InitializationDenied, None);
        assert_eq!(client.pending_frame(), None);
        assert_eq!(client.phase(), SessionPhase::Initialization);

        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(frame)));
        exchange(&mut client, &mut server, Role::Server, Code::InitializationAccepted, None);
        exchange(&mut client, &mut server, Role::Client, Code::QieRequest, None);
        exchange(&mut client, &mut server, Role::Server, Code::QieEnded, None);
        exchange(&mut client, &mut server, Role::Server, Code::PeDenied, None);
        assert_eq!(client.phase(), SessionPhase::Aborted);
        assert_eq!(client.frame_id(), None);
    }

    #[test]
    fn test_change_parameter_keeps_phase() {
        let (mut client, mut server) = identified();
        let mut change = Content::new();
        change.insert("parameter".into(), "dsp.symbol_rate".into());
        change.insert("value".into(), 50.into());
        exchange(&mut client, &mut server, Role::Client, Code::ChangeParameterRequest, Some(&change));
        exchange(&mut client, &mut server, Role::Server, Code::ParameterChanged, None);
        assert_eq!(client.phase(), SessionPhase::Initialization);
        assert_eq!(server.phase(), SessionPhase::Initialization);
    }

    #[test]
    fn test_reidentification_preserves_frame() {
        let (mut client, mut server) = identified();
        let frame = FrameIdentifier::new();
        exchange(&mut client, &mut server, Role::Client, Code::InitializationRequest, Some(&init_request(frame)));
        exchange(&mut client, &mut server, Role::Server, Code::InitializationAccepted, None);
        exchange(&mut client, &mut server, Role::Client, Code::QieRequest, None);

        exchange(&mut client, &mut server, Role::Server, Code::AuthenticationInvalid, None);
        assert_eq!(client.phase(), SessionPhase::Identification);
        assert_eq!(client.resume_phase(), Some(SessionPhase::QuantumExchange));
        assert_eq!(client.frame_id(), Some(frame));
        assert!(client.check_outgoing(Code::QieTrigger, None).is_err());

        exchange(&mut client, &mut server, Role::Client, Code::IdentificationRequest, Some(&identification()));
        let response = IdentificationResponse {
            serial_number: "A1".into(),
        }
        .to_content()
        .expect("content failed");
        exchange(&mut client, &mut server, Role::Server, Code::IdentificationResponse, Some(&response));
        assert_eq!(client.phase(), SessionPhase::QuantumExchange);
        assert_eq!(server.phase(), SessionPhase::QuantumExchange);
        assert_eq!(server.frame_id(), Some(frame));
        assert_eq!(client.resume_phase(), None);
    }

    #[test]
    fn test_role_asymmetry() {
        let (client, server) = identified();
        // The server never initiates.
        assert!(matches!(
            server.check_outgoing(Code::InitializationRequest, Some(&init_request(FrameIdentifier::new()))),
            Err(Error::IllegalSend { .. })
        ));
        assert!(server.check_outgoing(Code::Disconnection, None).is_err());
        assert!(client.check_outgoing(Code::InitializationAccepted, None).is_err());
        assert!(client.check_outgoing(Code::ParameterChanged, None).is_err());
        assert!(!permits(SessionPhase::QuantumExchange, Role::Server, Code::QieRequest));
        assert!(permits(SessionPhase::QuantumExchange, Role::Client, Code::QieRequest));
    }

    #[test]
    fn test_polarisation_outside_identification() {
        assert!(!permits(SessionPhase::Identification, Role::Client, Code::RequestPolarisationRecovery));
        assert!(permits(SessionPhase::ErrorCorrection, Role::Client, Code::RequestPolarisationRecovery));
        assert!(permits(SessionPhase::ErrorCorrection, Role::Server, Code::PolarisationRecoveryAck));
    }

    #[test]
    fn test_disconnected_is_terminal() {
        for &(code, _, _) in CATALOG {
            assert!(!permits(SessionPhase::Disconnected, Role::Client, code));
            assert_eq!(
                permits(SessionPhase::Disconnected, Role::Server, code),
                code == Code::DisconnectionAck
            );
        }
    }

    #[test]
    fn test_content_requirements() {
        let client = SessionStateMachine::new(Role::Client);
        assert!(matches!(
            client.check_outgoing(Code::IdentificationRequest, None),
            Err(Error::InvalidContent { .. })
        ));
        assert!(matches!(
            client.check_outgoing(Code::Abort, Some(&Content::new())),
            Ok(_)
        ));
        assert!(matches!(
            client.check_outgoing(Code::AbortAck, Some(&Content::new())),
            Err(Error::InvalidContent { .. })
        ));

        let server = SessionStateMachine::new(Role::Server);
        assert!(matches!(
            server.check_incoming(Code::IdentificationRequest, None),
            Err(Error::InvalidContent { .. })
        ));
        // Surplus content on an empty code is tolerated on receipt.
        assert!(server.check_incoming(Code::AbortAck, Some(&Content::new())).is_ok());
    }

    #[test]
    fn test_initialization_requires_frame_uuid() {
        let (client, server) = identified();
        let mut content = Content::new();
        content.insert("frame_uuid".into(), "not-a-uuid".into());
        assert!(matches!(
            server.check_incoming(Code::InitializationRequest, Some(&content)),
            Err(Error::InvalidContent { .. })
        ));
        assert!(client
            .check_outgoing(Code::InitializationRequest, Some(&Content::new()))
            .is_err());
    }

    #[test]
    fn test_frame_identifier_serde() {
        let frame = FrameIdentifier::new();
        let json = serde_json::to_string(&frame).expect("serialize failed");
        assert_eq!(json, format!("\"{}\"", frame));
        let parsed: FrameIdentifier = serde_json::from_str(&json).expect("parse failed");
        assert_eq!(parsed, frame);
        assert_ne!(FrameIdentifier::new(), frame);
    }

    #[test]
    fn test_session_config_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"max_failures": 5}"#).expect("parse failed");
        assert_eq!(config.max_failures, 5);
        assert_eq!(config.challenge_length, DEFAULT_CHALLENGE_LENGTH);
        assert_eq!(config.max_content_length, DEFAULT_MAX_CONTENT_LENGTH);
    }
}
