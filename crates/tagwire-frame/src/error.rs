use std::io::ErrorKind;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The part header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x5457 \"TW\")")]
    InvalidMagic,

    /// The part header carries flag bits this version does not understand.
    #[error("unknown frame flags 0x{0:04x}")]
    UnknownFlags(u16),

    /// A frame payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A frame set holds more frames than the configured maximum.
    #[error("too many frames in one message (max {max})")]
    TooManyFrames { max: usize },

    /// A frame set must contain at least one frame.
    #[error("frame set must not be empty")]
    EmptyFrameSet,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame set was received.
    #[error("connection closed (incomplete frame set)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error is a read/write timeout on the underlying stream.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
