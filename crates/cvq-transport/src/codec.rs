//! Streaming frame reads and writes.
//!
//! A frame is read segment by segment: the 4-byte prefix, the signed
//! digest, the variable header, then exactly `content_length` content
//! bytes. End of stream before the first prefix byte is a disconnection;
//! end of stream inside a frame is a truncated frame.

use crate::{Error, Result};
use cvq_core::frame::{FramePrefix, VariableHeader, PREFIX_LEN};
use cvq_core::{Frame, FrameError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read one frame.
///
/// # Errors
///
/// - [`Error::SocketDisconnection`] if the stream ends between frames
/// - [`FrameError::Truncated`] if it ends inside a frame
/// - [`FrameError::MalformedHeader`] if the variable header does not parse
/// - [`FrameError::ContentTooLarge`] if the declared content length exceeds
///   `max_content_length` (the content is not read)
pub async fn read_frame<R>(reader: &mut R, max_content_length: u64) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; PREFIX_LEN];
    let read = fill(reader, &mut prefix).await?;
    if read == 0 {
        return Err(Error::SocketDisconnection);
    }
    if read < PREFIX_LEN {
        return Err(truncated(PREFIX_LEN, read));
    }
    let prefix = FramePrefix::parse(&prefix)?;

    let signed_digest = read_segment(reader, prefix.digest_length as usize).await?;
    let header_bytes = read_segment(reader, prefix.header_length as usize).await?;
    let header = VariableHeader::from_bytes(&header_bytes)?;
    if header.content_length > max_content_length {
        return Err(FrameError::ContentTooLarge {
            declared: header.content_length,
            max: max_content_length,
        }
        .into());
    }
    let content = read_segment(reader, header.content_length as usize).await?;

    Ok(Frame::from_parts(signed_digest, header_bytes, content)?)
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.to_bytes()?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

// === Helper functions ===

/// Read until `buf` is full or the stream ends; returns the bytes read.
async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn read_segment<R>(reader: &mut R, len: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; len];
    let read = fill(reader, &mut buf).await?;
    if read < len {
        return Err(truncated(len, read));
    }
    Ok(buf)
}

fn truncated(needed: usize, available: usize) -> Error {
    FrameError::Truncated { needed, available }.into()
}
