//! Authentication context: digest signing, challenge chaining and failure
//! escalation.
//!
//! Each message carries a `challenge` (the value the peer issued in its
//! previous message) and a `next_challenge` (a fresh value the peer must
//! echo back). A frame is accepted only if its signed digest verifies and
//! its `challenge` equals the value we issued last. An accepted challenge
//! is consumed, so a replayed frame fails even with a valid signature.
//!
//! `IDENTIFICATION_REQUEST` and `AUTHENTICATION_INVALID` may bypass the
//! echo check, but only where the chain cannot be intact:
//!
//! - `IDENTIFICATION_REQUEST` before any frame was accepted, or right after
//!   an `AUTHENTICATION_INVALID` was sent or received.
//! - `AUTHENTICATION_INVALID` when it echoes the last challenge we saw
//!   echoed correctly (the peer rejected what followed).
//!
//! Their signature is always verified, and the `next_challenge` of every
//! accepted exempt frame is remembered so the same frame is never accepted
//! twice.

use crate::codes::Code;
use crate::frame::Frame;
use crate::session::SessionConfig;
use crate::Result;
use cvq_crypto::Authenticator;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// Why an incoming frame was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// The signed digest does not match the header and content.
    #[error("Signed digest does not verify")]
    BadSignature,

    /// The echoed challenge is not the one we issued.
    #[error("Challenge mismatch (expected {expected:?}, received {received:?})")]
    ChallengeMismatch {
        /// Challenge we were waiting for, if any is outstanding.
        expected: Option<String>,
        /// Challenge found in the frame.
        received: String,
    },
}

/// Codes that may be accepted without a matching echoed challenge.
pub fn is_echo_exempt(code: u8) -> bool {
    code == Code::IdentificationRequest.to_u8() || code == Code::AuthenticationInvalid.to_u8()
}

/// Generator of `next_challenge` values.
pub trait ChallengeSource: Send + Sync {
    /// Produce the next challenge.
    fn next_challenge(&mut self) -> String;
}

/// Unpredictable alphanumeric challenges drawn from the OS RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomChallenges {
    length: usize,
}

impl RandomChallenges {
    /// Challenges of `length` characters.
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl ChallengeSource for RandomChallenges {
    fn next_challenge(&mut self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// Predetermined challenges, then random ones once the script runs out.
///
/// Useful to reproduce a recorded exchange.
#[derive(Debug, Clone)]
pub struct ScriptedChallenges {
    script: VecDeque<String>,
    fallback: RandomChallenges,
}

impl ScriptedChallenges {
    /// Replay `script` in order.
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(Into::into).collect(),
            fallback: RandomChallenges::new(crate::session::DEFAULT_CHALLENGE_LENGTH),
        }
    }
}

impl ChallengeSource for ScriptedChallenges {
    fn next_challenge(&mut self) -> String {
        match self.script.pop_front() {
            Some(challenge) => challenge,
            None => self.fallback.next_challenge(),
        }
    }
}

/// Per-session authentication state.
pub struct AuthContext {
    authenticator: Box<dyn Authenticator>,
    challenges: Box<dyn ChallengeSource>,
    /// Value the peer must echo in its next message.
    challenge_we_issued: Option<String>,
    /// Value received from the peer, echoed in our next message.
    challenge_we_must_echo: String,
    /// Last challenge of ours the peer echoed correctly.
    last_echoed: String,
    /// No frame accepted yet, or an `AUTHENTICATION_INVALID` just went by.
    chain_reset: bool,
    /// `next_challenge` values of accepted exempt frames.
    exempt_seen: HashSet<String>,
    consecutive_failures: u32,
    max_failures: u32,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("authenticator", &self.authenticator.name())
            .field("consecutive_failures", &self.consecutive_failures)
            .field("max_failures", &self.max_failures)
            .finish_non_exhaustive()
    }
}

impl AuthContext {
    /// Fresh context; no challenge issued yet.
    pub fn new(authenticator: Box<dyn Authenticator>, config: &SessionConfig) -> Self {
        Self {
            authenticator,
            challenges: Box::new(RandomChallenges::new(config.challenge_length)),
            challenge_we_issued: None,
            challenge_we_must_echo: String::new(),
            last_echoed: String::new(),
            chain_reset: true,
            exempt_seen: HashSet::new(),
            consecutive_failures: 0,
            max_failures: config.max_failures.max(1),
        }
    }

    /// Replace the challenge generator.
    pub fn with_challenge_source(mut self, source: impl ChallengeSource + 'static) -> Self {
        self.challenges = Box::new(source);
        self
    }

    /// Name of the configured backend.
    pub fn authenticator_name(&self) -> &'static str {
        self.authenticator.name()
    }

    /// Challenge pair for the next outgoing message.
    ///
    /// The returned `next_challenge` is recorded as the value the peer must
    /// echo.
    pub fn prepare_outgoing(&mut self) -> (String, String) {
        let next = self.challenges.next_challenge();
        self.challenge_we_issued = Some(next.clone());
        (self.challenge_we_must_echo.clone(), next)
    }

    /// Build and sign a frame for `code` with serialized `content`.
    ///
    /// The chain is not advanced: call [`AuthContext::commit`] once the
    /// frame was actually written.
    pub fn seal(&mut self, code: Code, content: Vec<u8>) -> Result<Frame> {
        let frame = Frame::new(
            code.to_u8(),
            self.challenge_we_must_echo.clone(),
            self.challenges.next_challenge(),
            content,
        )?;
        let signed = self.authenticator.sign(&frame.digest())?;
        Ok(frame.with_signed_digest(signed))
    }

    /// Record a sealed frame as sent: its `next_challenge` becomes the value
    /// the peer must echo.
    pub fn commit(&mut self, frame: &Frame) {
        self.challenge_we_issued = Some(frame.header.next_challenge.clone());
        if frame.code() == Code::AuthenticationInvalid.to_u8() {
            self.chain_reset = true;
        }
        tracing::debug!(
            code = frame.code(),
            content_length = frame.content.len(),
            "Frame sent, challenge issued"
        );
    }

    /// Verify signature and challenge of an incoming frame.
    ///
    /// A failure increments the consecutive failure counter and leaves the
    /// chain untouched; a success resets the counter, consumes the issued
    /// challenge and records the peer's `next_challenge` for our reply.
    pub fn verify_incoming(&mut self, frame: &Frame) -> core::result::Result<(), AuthFailure> {
        match self.check(frame) {
            Ok(()) => {
                self.consecutive_failures = 0;
                if let Some(issued) = self.challenge_we_issued.take() {
                    if issued == frame.header.challenge {
                        self.last_echoed = issued;
                    }
                }
                if is_echo_exempt(frame.code()) {
                    self.exempt_seen.insert(frame.header.next_challenge.clone());
                }
                self.chain_reset = frame.code() == Code::AuthenticationInvalid.to_u8();
                self.challenge_we_must_echo = frame.header.next_challenge.clone();
                tracing::debug!(code = frame.code(), "Frame verified, challenge consumed");
                Ok(())
            }
            Err(failure) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                tracing::warn!(
                    "Authentication failure {}/{} on code {}: {}",
                    self.consecutive_failures,
                    self.max_failures,
                    frame.code(),
                    failure
                );
                Err(failure)
            }
        }
    }

    fn check(&self, frame: &Frame) -> core::result::Result<(), AuthFailure> {
        if !self
            .authenticator
            .verify(&frame.digest(), &frame.signed_digest)
        {
            return Err(AuthFailure::BadSignature);
        }
        match &self.challenge_we_issued {
            Some(issued) if *issued == frame.header.challenge => Ok(()),
            _ if self.accepts_unechoed(frame) => Ok(()),
            expected => Err(AuthFailure::ChallengeMismatch {
                expected: expected.clone(),
                received: frame.header.challenge.clone(),
            }),
        }
    }

    fn accepts_unechoed(&self, frame: &Frame) -> bool {
        let window = match Code::from_u8(frame.code()) {
            Some(Code::IdentificationRequest) => self.chain_reset,
            Some(Code::AuthenticationInvalid) => frame.header.challenge == self.last_echoed,
            _ => false,
        };
        window && !self.exempt_seen.contains(&frame.header.next_challenge)
    }

    /// Current run of failed verifications.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Failure threshold.
    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    /// True once the failure threshold is reached.
    pub fn is_exhausted(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }

    /// Challenge the peer must echo next, if one is outstanding.
    pub fn challenge_we_issued(&self) -> Option<&str> {
        self.challenge_we_issued.as_deref()
    }

    /// Challenge our next message will echo.
    pub fn challenge_we_must_echo(&self) -> &str {
        &self.challenge_we_must_echo
    }
}
