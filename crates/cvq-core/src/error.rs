//! Error types for protocol operations.

use crate::auth::AuthFailure;
use crate::codes::Code;
use crate::frame::FrameError;
use crate::session::{Role, SessionPhase};
use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Protocol operation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Frame could not be encoded or decoded.
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Authentication of an incoming frame failed (recoverable).
    #[error("Authentication failure: {0}")]
    Authentication(#[from] AuthFailure),

    /// Too many consecutive authentication failures (suspected
    /// interception).
    #[error("Authentication failed {failures} consecutive times, session compromised")]
    AuthenticationExhausted {
        /// Consecutive failures counted.
        failures: u32,
    },

    /// Code absent from the catalog.
    #[error("Unknown code: {0}")]
    UnknownCode(u8),

    /// Code legal in the catalog but not in the current phase.
    #[error("Unexpected code {code} in phase {phase:?}")]
    UnexpectedCode {
        /// Offending code.
        code: Code,
        /// Phase at the time.
        phase: SessionPhase,
    },

    /// Content does not match what the code requires.
    #[error("Invalid content for {code}: {reason}")]
    InvalidContent {
        /// Code the content belongs to.
        code: Code,
        /// What is wrong with it.
        reason: String,
    },

    /// The local role may not send this code in the current phase.
    #[error("{code} may not be sent by {role:?} in phase {phase:?}")]
    IllegalSend {
        /// Rejected code.
        code: Code,
        /// Local role.
        role: Role,
        /// Phase at the time.
        phase: SessionPhase,
    },

    /// The session refuses further traffic.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Cryptographic error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] cvq_crypto::Error),
}

impl Error {
    /// Sentinel code reported to the caller for this error, if any.
    ///
    /// Local misuse ([`Error::IllegalSend`], [`Error::InvalidState`],
    /// crypto failures while signing) has no sentinel.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Frame(_) | Error::InvalidContent { .. } => Some(ErrorCode::FrameError),
            Error::Authentication(_) | Error::AuthenticationExhausted { .. } => {
                Some(ErrorCode::AuthenticationFailure)
            }
            Error::UnknownCode(_) => Some(ErrorCode::UnknownCode),
            Error::UnexpectedCode { .. } => Some(ErrorCode::UnexpectedCode),
            Error::IllegalSend { .. } | Error::InvalidState(_) | Error::Crypto(_) => None,
        }
    }

    /// True if the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::AuthenticationExhausted { .. })
    }
}

/// Local sentinel codes. These never appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum ErrorCode {
    /// The peer disconnected (-1).
    SocketDisconnection = -1,
    /// The frame was not well formed (-2).
    FrameError = -2,
    /// Signature or challenge check failed (-3).
    AuthenticationFailure = -3,
    /// The code is not in the catalog (-4).
    UnknownCode = -4,
    /// The code is not legal in the current phase (-5).
    UnexpectedCode = -5,
    /// The receive timeout elapsed (-6).
    Timeout = -6,
}

impl ErrorCode {
    /// Numeric value.
    pub fn to_i8(self) -> i8 {
        self as i8
    }

    /// Convert from the numeric value.
    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            -1 => Some(Self::SocketDisconnection),
            -2 => Some(Self::FrameError),
            -3 => Some(Self::AuthenticationFailure),
            -4 => Some(Self::UnknownCode),
            -5 => Some(Self::UnexpectedCode),
            -6 => Some(Self::Timeout),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::SocketDisconnection.to_i8(), -1);
        assert_eq!(ErrorCode::FrameError.to_i8(), -2);
        assert_eq!(ErrorCode::AuthenticationFailure.to_i8(), -3);
        assert_eq!(ErrorCode::UnknownCode.to_i8(), -4);
        for value in -6..=-1 {
            assert_eq!(ErrorCode::from_i8(value).map(ErrorCode::to_i8), Some(value));
        }
        assert_eq!(ErrorCode::from_i8(0), None);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(Error::UnknownCode(250).code(), Some(ErrorCode::UnknownCode));
        assert_eq!(
            Error::Frame(FrameError::MalformedHeader("x".into())).code(),
            Some(ErrorCode::FrameError)
        );
        assert_eq!(
            Error::Authentication(AuthFailure::BadSignature).code(),
            Some(ErrorCode::AuthenticationFailure)
        );
        assert!(Error::AuthenticationExhausted { failures: 3 }.is_fatal());
        assert!(!Error::UnknownCode(1).is_fatal());
        assert_eq!(Error::InvalidState("closed".into()).code(), None);
    }
}
