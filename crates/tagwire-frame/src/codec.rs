use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::frame_set::FrameSet;

/// Part header: magic (2) + length (4) + flags (2) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Magic bytes: "TW" (0x54 0x57).
pub const MAGIC: [u8; 2] = [0x54, 0x57];

/// Flag bit: another part of the same frame set follows.
pub const FLAG_MORE: u16 = 0x0001;

const KNOWN_FLAGS: u16 = FLAG_MORE;

/// Default maximum size of one frame payload: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Default maximum number of frames in one frame set.
pub const DEFAULT_MAX_FRAMES: usize = 65_536;

/// One decoded part of a frame set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// The frame payload.
    pub payload: Bytes,
    /// Whether more parts of the same frame set follow.
    pub more: bool,
}

/// Encode one frame set part into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬──────────┬─────────────────┐
/// │ Magic (2B)   │ Length    │ Flags    │ Payload         │
/// │ 0x54 0x57    │ (4B LE)   │ (2B LE)  │ (Length bytes)  │
/// │ "TW"         │           │ bit0=MORE│                 │
/// └──────────────┴───────────┴──────────┴─────────────────┘
/// ```
pub fn encode_part(payload: &[u8], more: bool, dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_u16_le(if more { FLAG_MORE } else { 0 });
    dst.put_slice(payload);
    Ok(())
}

/// Encode a whole frame set; every part but the last carries `MORE`.
pub fn encode_frame_set(set: &FrameSet, dst: &mut BytesMut) -> Result<()> {
    dst.reserve(set.wire_size());
    let last = set.len() - 1;
    for (index, frame) in set.iter().enumerate() {
        encode_part(frame, index < last, dst)?;
    }
    Ok(())
}

/// Decode one part from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete part yet.
/// On success, consumes the part bytes from the buffer.
pub fn decode_part(src: &mut BytesMut, max_payload: usize) -> Result<Option<Part>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    let flags = u16::from_le_bytes([src[6], src[7]]);

    if flags & !KNOWN_FLAGS != 0 {
        return Err(FrameError::UnknownFlags(flags));
    }

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Part {
        payload,
        more: flags & FLAG_MORE != 0,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum size of one frame payload in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Maximum number of frames in one frame set. Default: 65 536.
    pub max_frames: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_frames: DEFAULT_MAX_FRAMES,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
