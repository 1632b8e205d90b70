//! Transport layer errors.

use cvq_core::{ErrorCode, FrameError};
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The peer closed the connection or the endpoint was closed.
    #[error("Socket disconnected")]
    SocketDisconnection,

    /// No frame arrived within the receive timeout.
    #[error("Receive timed out after {0:?}")]
    Timeout(Duration),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Unusable endpoint configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Protocol error from core.
    #[error("Protocol error: {0}")]
    Protocol(#[from] cvq_core::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl Error {
    /// Sentinel code reported to the caller for this error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::SocketDisconnection | Error::ConnectionFailed(_) | Error::Io(_) => {
                Some(ErrorCode::SocketDisconnection)
            }
            Error::Timeout(_) => Some(ErrorCode::Timeout),
            Error::Config(_) => None,
            Error::Protocol(e) => e.code(),
        }
    }

    /// True if the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::Protocol(e) => e.is_fatal(),
            _ => false,
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Protocol(e.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected => Error::SocketDisconnection,
            _ => Error::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_map_to_disconnection() {
        for kind in [ErrorKind::ConnectionReset, ErrorKind::BrokenPipe, ErrorKind::UnexpectedEof] {
            let error = Error::from(std::io::Error::from(kind));
            assert!(matches!(error, Error::SocketDisconnection));
            assert_eq!(error.code(), Some(ErrorCode::SocketDisconnection));
        }
        let other = Error::from(std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(other, Error::Io(_)));
    }

    #[test]
    fn test_sentinel_codes() {
        assert_eq!(
            Error::Timeout(Duration::from_millis(5)).code(),
            Some(ErrorCode::Timeout)
        );
        assert_eq!(
            Error::from(FrameError::MalformedHeader("bad".into())).code(),
            Some(ErrorCode::FrameError)
        );
        assert_eq!(
            Error::Protocol(cvq_core::Error::UnknownCode(250)).code(),
            Some(ErrorCode::UnknownCode)
        );
        assert_eq!(Error::Config("x".into()).code(), None);
        assert!(Error::Config("x".into()).is_fatal());
        assert!(Error::Protocol(cvq_core::Error::AuthenticationExhausted { failures: 3 }).is_fatal());
    }
}
