// Wire frame format and encoding/decoding
//
// Frame format (binary):
// [length: u32 LE] [kind: u8] [payload bytes] [crc32: u32 LE]
//
// `length` counts the kind byte and the payload. The CRC covers the same
// bytes. Payloads are bincode-encoded protocol messages.
//
// Kinds:
// - REQUEST (1): client to server
// - RESPONSE (2): server to client

use crc32fast::Hasher;
use roomdb_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Read, Write};

/// Largest accepted frame content (kind + payload)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const LENGTH_LEN: usize = 4;
const CRC_LEN: usize = 4;

/// Frame kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Request = 1,
    Response = 2,
}

impl TryFrom<u8> for FrameKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FrameKind::Request),
            2 => Ok(FrameKind::Response),
            _ => Err(Error::Protocol(format!("Unknown frame kind: {}", value))),
        }
    }
}

/// One framed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Serialize `message` into a frame of the given kind
    pub fn from_message<T: Serialize>(kind: FrameKind, message: &T) -> Result<Self> {
        let payload = bincode::serialize(message)
            .map_err(|e| Error::Serialization(format!("Failed to serialize message: {}", e)))?;

        Ok(Self { kind, payload })
    }

    /// Deserialize the payload, checking the frame kind first
    pub fn into_message<T: DeserializeOwned>(self, expected: FrameKind) -> Result<T> {
        if self.kind != expected {
            return Err(Error::Protocol(format!(
                "Expected {:?} frame, got {:?}",
                expected, self.kind
            )));
        }

        bincode::deserialize(&self.payload)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize message: {}", e)))
    }

    /// Encode frame to bytes with framing and CRC
    pub fn encode(&self) -> Result<Vec<u8>> {
        let content_len = 1 + self.payload.len();
        if content_len > MAX_FRAME_LEN {
            return Err(Error::Protocol(format!(
                "Frame too large: {} bytes",
                content_len
            )));
        }

        let kind_byte = self.kind as u8;
        let crc = checksum(kind_byte, &self.payload);

        let mut frame = Vec::with_capacity(LENGTH_LEN + content_len + CRC_LEN);
        frame.extend_from_slice(&(content_len as u32).to_le_bytes());
        frame.push(kind_byte);
        frame.extend_from_slice(&self.payload);
        frame.extend_from_slice(&crc.to_le_bytes());

        Ok(frame)
    }

    /// Decode one frame from the front of `data`.
    ///
    /// Returns the frame and the number of bytes it occupied.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let prefix = take::<LENGTH_LEN>(data, 0)
            .ok_or_else(|| Error::Protocol("Incomplete frame: missing length".to_string()))?;
        let length = content_length(prefix)?;

        let total_size = LENGTH_LEN + length + CRC_LEN;
        let crc = take::<CRC_LEN>(data, LENGTH_LEN + length).ok_or_else(|| {
            Error::Protocol(format!(
                "Incomplete frame: expected {} bytes, got {}",
                total_size,
                data.len()
            ))
        })?;

        let frame = Frame::from_content(&data[LENGTH_LEN..LENGTH_LEN + length], crc)?;
        Ok((frame, total_size))
    }

    /// Write this frame to a stream
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let encoded = self.encode()?;
        writer.write_all(&encoded)?;
        writer.flush()?;
        Ok(())
    }

    /// Read the next frame from a stream.
    ///
    /// Returns `Ok(None)` on a clean end of stream before any byte of a
    /// frame was read. A stream ending anywhere inside a frame, including
    /// inside the length prefix, is `Error::Protocol`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut prefix = [0u8; LENGTH_LEN];
        match reader.read_exact(&mut prefix[..1]) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        }
        reader
            .read_exact(&mut prefix[1..])
            .map_err(|e| truncated(e, "length"))?;

        let length = content_length(prefix)?;

        let mut content = vec![0u8; length];
        reader
            .read_exact(&mut content)
            .map_err(|e| truncated(e, "content"))?;

        let mut crc = [0u8; CRC_LEN];
        reader
            .read_exact(&mut crc)
            .map_err(|e| truncated(e, "checksum"))?;

        Frame::from_content(&content, crc).map(Some)
    }

    /// Build a frame from its kind byte and payload after checking the CRC
    fn from_content(content: &[u8], crc: [u8; CRC_LEN]) -> Result<Self> {
        let (&kind_byte, payload) = content
            .split_first()
            .ok_or_else(|| Error::Protocol("Empty frame".to_string()))?;

        let expected_crc = u32::from_le_bytes(crc);
        let actual_crc = checksum(kind_byte, payload);
        if actual_crc != expected_crc {
            return Err(Error::Protocol(format!(
                "CRC mismatch: expected {}, got {}",
                expected_crc, actual_crc
            )));
        }

        Ok(Frame {
            kind: FrameKind::try_from(kind_byte)?,
            payload: payload.to_vec(),
        })
    }
}

/// Validate a length prefix, returning the content length it announces
fn content_length(prefix: [u8; LENGTH_LEN]) -> Result<usize> {
    let length = u32::from_le_bytes(prefix) as usize;
    if length == 0 || length > MAX_FRAME_LEN {
        return Err(Error::Protocol(format!("Invalid frame length: {}", length)));
    }
    Ok(length)
}

fn checksum(kind_byte: u8, payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[kind_byte]);
    hasher.update(payload);
    hasher.finalize()
}

fn take<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    data.get(offset..offset + N)?.try_into().ok()
}

fn truncated(err: io::Error, part: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::Protocol(format!("Incomplete frame: truncated {}", part))
    } else {
        Error::Io(err)
    }
}
