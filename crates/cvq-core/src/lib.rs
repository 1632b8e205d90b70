//! Protocol engine for the CV-QKD classical control channel.
//!
//! This crate implements the transport-independent parts of the protocol:
//! - Message catalog: codes, categories and content shapes
//! - Frame parsing and serialization
//! - Structured message content and typed payloads
//! - Authentication context with challenge chaining and replay protection
//! - Session state machine deciding which code is legal in which phase
//!
//! No I/O happens here. The async endpoint lives in `cvq-transport`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod codes;
pub mod content;
pub mod error;
pub mod frame;
pub mod session;

pub use auth::{AuthContext, AuthFailure};
pub use codes::{Category, Code, CodeInfo, ContentShape};
pub use content::{Content, Message, Payload};
pub use error::{Error, ErrorCode, Result};
pub use frame::{Frame, FrameError};
pub use session::{FrameIdentifier, Role, SessionConfig, SessionPhase, SessionStateMachine};
