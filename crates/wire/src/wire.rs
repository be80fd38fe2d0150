// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing: 4-byte big-endian length prefix + JSON payload.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Default ceiling on one frame (~1 MiB). Callers may pass a tighter
/// limit from configuration.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Protocol failures.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame of {got} bytes exceeds limit of {limit}")]
    FrameTooLarge { got: usize, limit: usize },
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer closed the connection")]
    Closed,
}

impl ProtocolError {
    pub fn kind(&self) -> atc_core::ErrorKind {
        match self {
            ProtocolError::FrameTooLarge { .. } | ProtocolError::Malformed(_) => {
                atc_core::ErrorKind::Validation
            }
            ProtocolError::Io(_) | ProtocolError::Closed => atc_core::ErrorKind::Internal,
        }
    }
}

/// Encode a message into a length-prefixed frame.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(message)?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode one frame produced by [`encode`]. The input must contain the
/// complete frame.
pub fn decode<T: DeserializeOwned>(frame: &[u8], limit: usize) -> Result<T, ProtocolError> {
    if frame.len() < 4 {
        return Err(ProtocolError::Closed);
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&frame[..4]);
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > limit {
        return Err(ProtocolError::FrameTooLarge { got: len, limit });
    }
    if frame.len() < 4 + len {
        return Err(ProtocolError::Closed);
    }
    Ok(serde_json::from_slice(&frame[4..4 + len])?)
}

/// Read one message from an async stream.
pub async fn read_message<T, R>(reader: &mut R, limit: usize) -> Result<T, ProtocolError>
where
    T: DeserializeOwned,
    R: tokio::io::AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::Closed)
        }
        Err(err) => return Err(err.into()),
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > limit {
        return Err(ProtocolError::FrameTooLarge { got: len, limit });
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Write one message to an async stream and flush it.
pub async fn write_message<T, W>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    T: Serialize,
    W: tokio::io::AsyncWrite + Unpin,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
