use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tagwire_transport::WireStream;

use crate::codec::{decode_part, FrameConfig};
use crate::error::{FrameError, Result};
use crate::frame_set::FrameSet;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frame sets from any `Read` stream.
///
/// Handles partial reads internally; callers always get whole frame sets.
/// Bytes and parts received before a read timeout are kept, so a timed-out
/// call can simply be retried.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    pending: Vec<Bytes>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            pending: Vec::new(),
            config,
        }
    }

    /// Read the next complete frame set (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame_set(&mut self) -> Result<FrameSet> {
        loop {
            while let Some(part) = decode_part(&mut self.buf, self.config.max_payload_size)? {
                if self.pending.len() >= self.config.max_frames {
                    self.pending.clear();
                    return Err(FrameError::TooManyFrames {
                        max: self.config.max_frames,
                    });
                }
                self.pending.push(part.payload);
                if !part.more {
                    return FrameSet::from_frames(std::mem::take(&mut self.pending));
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Whether part of a frame set has been received but not yet returned.
    pub fn has_partial(&self) -> bool {
        !self.pending.is_empty() || !self.buf.is_empty()
    }

    /// Drop any partially received frame set.
    pub fn discard_partial(&mut self) {
        self.pending.clear();
        self.buf.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<WireStream> {
    /// Create a frame reader for a `WireStream` and apply read timeout from config.
    pub fn with_config_stream(inner: WireStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }

    /// Change the read timeout on the underlying stream.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.inner
            .set_read_timeout(timeout)
            .map_err(transport_to_frame_error)?;
        self.config.read_timeout = timeout;
        Ok(())
    }
}

pub(crate) fn transport_to_frame_error(err: tagwire_transport::TransportError) -> FrameError {
    match err {
        tagwire_transport::TransportError::Io(io)
        | tagwire_transport::TransportError::Accept(io) => FrameError::Io(io),
        tagwire_transport::TransportError::Bind { source, .. }
        | tagwire_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
