//! Session endpoints for the CV-QKD classical control protocol.
//!
//! Runs the protocol engine from `cvq-core` over any tokio byte stream:
//! - Streaming frame reads and writes
//! - Server and Client endpoints with automatic protocol replies
//! - Optional receive timeout
//! - TCP listener and connector
//!
//! Every failure surfaces as a typed [`Error`] that maps to one of the
//! local sentinel codes of [`cvq_core::ErrorCode`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod tcp;

pub use config::EndpointConfig;
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use tcp::{connect, TcpServer};
