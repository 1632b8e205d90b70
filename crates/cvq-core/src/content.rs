//! Structured message content.
//!
//! Content is a JSON object. A frame with zero content bytes carries no
//! content. Typed payload records convert to and from [`Content`] through
//! the [`Payload`] trait; open-ended parameters are kept in a nested map
//! rather than as extra top-level fields.

use crate::codes::Code;
use crate::session::FrameIdentifier;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Message content: a JSON object.
pub type Content = serde_json::Map<String, Value>;

/// Protocol version advertised during identification.
pub const PROTOCOL_VERSION: &str = "0.2";

/// Content could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ContentError(pub String);

/// Serialize optional content to wire bytes (empty for `None`).
pub fn encode_content(content: Option<&Content>) -> Result<Vec<u8>, ContentError> {
    match content {
        Some(map) => serde_json::to_vec(map).map_err(|e| ContentError(e.to_string())),
        None => Ok(Vec::new()),
    }
}

/// Parse wire bytes into optional content.
pub fn decode_content(bytes: &[u8]) -> Result<Option<Content>, ContentError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(ContentError(format!(
            "content must be an object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ContentError(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A typed content record.
pub trait Payload: Serialize + DeserializeOwned {
    /// Convert to content.
    fn to_content(&self) -> Result<Content, ContentError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ContentError(format!(
                "payload serialized to {}",
                json_kind(&other)
            ))),
            Err(e) => Err(ContentError(e.to_string())),
        }
    }

    /// Parse from content.
    fn from_content(content: &Content) -> Result<Self, ContentError> {
        serde_json::from_value(Value::Object(content.clone())).map_err(|e| ContentError(e.to_string()))
    }
}

/// A received (or to be sent) message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Message code.
    pub code: Code,
    /// Optional content.
    pub content: Option<Content>,
}

impl Message {
    /// Message without content.
    pub fn new(code: Code) -> Self {
        Self {
            code,
            content: None,
        }
    }

    /// Message with content.
    pub fn with_content(code: Code, content: Content) -> Self {
        Self {
            code,
            content: Some(content),
        }
    }

    /// Parse the content as payload `P`.
    pub fn payload<P: Payload>(&self) -> Result<P, ContentError> {
        match &self.content {
            Some(content) => P::from_content(content),
            None => Err(ContentError(format!("{} carries no content", self.code))),
        }
    }
}

/// `IDENTIFICATION_REQUEST` content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationRequest {
    /// Serial number of the requesting machine.
    pub serial_number: String,
    /// Protocol version spoken by the requester.
    pub protocol_version: String,
}

impl Payload for IdentificationRequest {}

impl IdentificationRequest {
    /// Request advertising [`PROTOCOL_VERSION`].
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

/// `IDENTIFICATION_RESPONSE` content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationResponse {
    /// Serial number of the answering machine.
    pub serial_number: String,
}

impl Payload for IdentificationResponse {}

/// Content of `UNKNOWN_COMMAND` and `UNEXPECTED_COMMAND`: the offending code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReport {
    /// The code that triggered the report.
    pub code: u8,
}

impl Payload for CodeReport {}

/// `INITIALIZATION_REQUEST` content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializationRequest {
    /// Identifier of the frame being started.
    pub frame_uuid: FrameIdentifier,
    /// Free-form frame parameters.
    #[serde(default)]
    pub parameters: Content,
}

impl Payload for InitializationRequest {}

impl InitializationRequest {
    /// Request for a fresh frame with no extra parameters.
    pub fn new() -> Self {
        Self {
            frame_uuid: FrameIdentifier::new(),
            parameters: Content::new(),
        }
    }
}

impl Default for InitializationRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// `CHANGE_PARAMETER_REQUEST` content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeParameterRequest {
    /// Parameter path.
    pub parameter: String,
    /// Requested value.
    pub value: Value,
}

impl Payload for ChangeParameterRequest {}

/// `PE_SYMBOLS_REQUEST` content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeSymbolsRequest {
    /// Indices of the requested symbols.
    pub indices: Vec<u64>,
}

impl Payload for PeSymbolsRequest {}

/// `PE_SYMBOLS_RESPONSE` content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeSymbolsResponse {
    /// Real parts.
    pub symbols_real: Vec<f64>,
    /// Imaginary parts.
    pub symbols_imag: Vec<f64>,
}

impl Payload for PeSymbolsResponse {}

impl PeSymbolsResponse {
    /// Check the response answers `request`: one complex symbol per index.
    pub fn check_against(&self, request: &PeSymbolsRequest) -> Result<(), ContentError> {
        let expected = request.indices.len();
        if self.symbols_real.len() != expected || self.symbols_imag.len() != expected {
            return Err(ContentError(format!(
                "expected {} symbols, got {} real and {} imaginary parts",
                expected,
                self.symbols_real.len(),
                self.symbols_imag.len()
            )));
        }
        Ok(())
    }
}
