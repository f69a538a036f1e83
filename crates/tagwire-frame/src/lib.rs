//! Multipart message framing over tagwire byte streams.
//!
//! A message is a [`FrameSet`]: an ordered, non-empty list of opaque frames.
//! On the wire each frame is one part with:
//! - A 2-byte magic number ("TW") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 2-byte little-endian flags word (`MORE` = another part follows)
//!
//! Readers only ever hand back whole frame sets; no partial messages, no
//! buffer management in user code.

pub mod codec;
pub mod error;
pub mod frame_set;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_part, encode_frame_set, encode_part, FrameConfig, Part, DEFAULT_MAX_FRAMES,
    DEFAULT_MAX_PAYLOAD, FLAG_MORE, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use frame_set::{Frame, FrameSet};
pub use reader::FrameReader;
pub use writer::FrameWriter;
