//! Frame codec.
//!
//! Wire layout (all integers big-endian):
//!
//! ```text
//! [u16 digest_len][u16 header_len][signed digest][variable header][content]
//! ```
//!
//! The variable header is a JSON object with exactly the fields `code`,
//! `challenge`, `next_challenge` and `content_length`. Content is opaque to
//! this module. Decoding never rejects a `code` that is absent from the
//! catalog: that is left to the session layer.

use cvq_crypto::{compute_digest, DIGEST_LEN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the fixed prefix (two u16 lengths).
pub const PREFIX_LEN: usize = 4;

/// Frame codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Signed digest does not fit the u16 length field.
    #[error("Signed digest too large: {0} bytes")]
    DigestTooLarge(usize),

    /// Serialized variable header does not fit the u16 length field.
    #[error("Variable header too large: {0} bytes")]
    HeaderTooLarge(usize),

    /// Fewer bytes available than declared.
    #[error("Truncated frame: need {needed} bytes, got {available}")]
    Truncated {
        /// Bytes required by the declared lengths.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// Variable header is not a well formed header record.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// Content segment length differs from the declared `content_length`.
    #[error("Content length mismatch: declared {declared}, got {actual}")]
    ContentLengthMismatch {
        /// Length declared in the header.
        declared: u64,
        /// Length of the content segment.
        actual: usize,
    },

    /// Declared content length exceeds the configured limit.
    #[error("Content too large: {declared} bytes (max {max})")]
    ContentTooLarge {
        /// Length declared in the header.
        declared: u64,
        /// Configured limit.
        max: u64,
    },
}

/// Variable header record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableHeader {
    /// Message code (may be absent from the catalog).
    pub code: u8,
    /// Challenge echoed back to the peer.
    pub challenge: String,
    /// Fresh challenge the peer must echo next.
    pub next_challenge: String,
    /// Exact byte length of the content.
    pub content_length: u64,
}

impl VariableHeader {
    /// Serialize to the JSON bytes placed on the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        serde_json::to_vec(self).map_err(|e| FrameError::MalformedHeader(e.to_string()))
    }

    /// Parse the JSON header bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        serde_json::from_slice(bytes).map_err(|e| FrameError::MalformedHeader(e.to_string()))
    }
}

/// Fixed 4-byte prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePrefix {
    /// Length of the signed digest.
    pub digest_length: u16,
    /// Length of the serialized variable header.
    pub header_length: u16,
}

impl FramePrefix {
    /// Parse the first four bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, FrameError> {
        check_len(data, PREFIX_LEN)?;
        Ok(Self {
            digest_length: read_u16_be(&data[0..2]),
            header_length: read_u16_be(&data[2..4]),
        })
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(self) -> [u8; PREFIX_LEN] {
        let digest = self.digest_length.to_be_bytes();
        let header = self.header_length.to_be_bytes();
        [digest[0], digest[1], header[0], header[1]]
    }
}

/// A protocol frame.
///
/// The raw header bytes are kept alongside the parsed header so the digest
/// is always recomputed over exactly what was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Signed digest (empty until signed).
    pub signed_digest: Vec<u8>,
    /// Parsed variable header.
    pub header: VariableHeader,
    header_bytes: Vec<u8>,
    /// Serialized content.
    pub content: Vec<u8>,
}

impl Frame {
    /// Build an unsigned frame.
    pub fn new(
        code: u8,
        challenge: impl Into<String>,
        next_challenge: impl Into<String>,
        content: Vec<u8>,
    ) -> Result<Self, FrameError> {
        let header = VariableHeader {
            code,
            challenge: challenge.into(),
            next_challenge: next_challenge.into(),
            content_length: content.len() as u64,
        };
        let header_bytes = header.to_bytes()?;
        if header_bytes.len() > u16::MAX as usize {
            return Err(FrameError::HeaderTooLarge(header_bytes.len()));
        }

        Ok(Self {
            signed_digest: Vec::new(),
            header,
            header_bytes,
            content,
        })
    }

    /// Assemble a frame from its received segments.
    ///
    /// Fails if the header is malformed or if `content` does not have the
    /// declared length.
    pub fn from_parts(
        signed_digest: Vec<u8>,
        header_bytes: Vec<u8>,
        content: Vec<u8>,
    ) -> Result<Self, FrameError> {
        let header = VariableHeader::from_bytes(&header_bytes)?;
        if header.content_length != content.len() as u64 {
            return Err(FrameError::ContentLengthMismatch {
                declared: header.content_length,
                actual: content.len(),
            });
        }

        Ok(Self {
            signed_digest,
            header,
            header_bytes,
            content,
        })
    }

    /// Attach the signed digest.
    pub fn with_signed_digest(mut self, signed_digest: Vec<u8>) -> Self {
        self.signed_digest = signed_digest;
        self
    }

    /// Raw message code.
    pub fn code(&self) -> u8 {
        self.header.code
    }

    /// Serialized variable header, as sent or received.
    pub fn header_bytes(&self) -> &[u8] {
        &self.header_bytes
    }

    /// Digest over header and content.
    pub fn digest(&self) -> [u8; DIGEST_LEN] {
        compute_digest(&self.header_bytes, &self.content)
    }

    /// Length of the signed digest.
    pub fn digest_length(&self) -> usize {
        self.signed_digest.len()
    }

    /// Length of the serialized variable header.
    pub fn header_length(&self) -> usize {
        self.header_bytes.len()
    }

    /// Prefix describing this frame.
    pub fn prefix(&self) -> Result<FramePrefix, FrameError> {
        let digest_length = u16::try_from(self.signed_digest.len())
            .map_err(|_| FrameError::DigestTooLarge(self.signed_digest.len()))?;
        let header_length = u16::try_from(self.header_bytes.len())
            .map_err(|_| FrameError::HeaderTooLarge(self.header_bytes.len()))?;
        Ok(FramePrefix {
            digest_length,
            header_length,
        })
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        let prefix = self.prefix()?;
        let mut buf = Vec::with_capacity(
            PREFIX_LEN + self.signed_digest.len() + self.header_bytes.len() + self.content.len(),
        );
        buf.extend_from_slice(&prefix.to_bytes());
        buf.extend_from_slice(&self.signed_digest);
        buf.extend_from_slice(&self.header_bytes);
        buf.extend_from_slice(&self.content);
        Ok(buf)
    }

    /// Parse a complete frame from `data`.
    pub fn parse(data: &[u8]) -> Result<Self, FrameError> {
        let prefix = FramePrefix::parse(data)?;
        let digest_end = PREFIX_LEN + prefix.digest_length as usize;
        let header_end = digest_end + prefix.header_length as usize;
        check_len(data, header_end)?;

        Self::from_parts(
            data[PREFIX_LEN..digest_end].to_vec(),
            data[digest_end..header_end].to_vec(),
            data[header_end..].to_vec(),
        )
    }
}

/// Encode a frame from its fields.
pub fn encode(
    code: u8,
    challenge: &str,
    next_challenge: &str,
    content: &[u8],
    signed_digest: &[u8],
) -> Result<Vec<u8>, FrameError> {
    if signed_digest.len() > u16::MAX as usize {
        return Err(FrameError::DigestTooLarge(signed_digest.len()));
    }
    Frame::new(code, challenge, next_challenge, content.to_vec())?
        .with_signed_digest(signed_digest.to_vec())
        .to_bytes()
}

/// Decode a complete frame.
pub fn decode(data: &[u8]) -> Result<Frame, FrameError> {
    Frame::parse(data)
}

// === Helper functions ===

#[inline]
fn check_len(data: &[u8], needed: usize) -> Result<(), FrameError> {
    if data.len() < needed {
        Err(FrameError::Truncated {
            needed,
            available: data.len(),
        })
    } else {
        Ok(())
    }
}

#[inline]
fn read_u16_be(data: &[u8]) -> u16 {
    u16::from_be_bytes([data[0], data[1]])
}
