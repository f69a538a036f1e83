use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tagwire_transport::WireStream;

use crate::codec::{encode_frame_set, FrameConfig};
use crate::error::{FrameError, Result};
use crate::frame_set::FrameSet;
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frame sets to any `Write` stream.
///
/// A frame set is encoded into one buffer and written in full before the
/// call returns, so the peer never observes half a message from this side.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and write a complete frame set (blocking).
    pub fn write_frame_set(&mut self, set: &FrameSet) -> Result<()> {
        self.write_frame_set_with(set, || false)
    }

    /// Encode and write a complete frame set, consulting `keep_waiting` each
    /// time the configured write timeout expires.
    ///
    /// Returning `true` resumes the write where it stopped; returning `false`
    /// fails with the timeout error and leaves the stream mid-message.
    pub fn write_frame_set_with<F>(&mut self, set: &FrameSet, mut keep_waiting: F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        if set.len() > self.config.max_frames {
            return Err(FrameError::TooManyFrames {
                max: self.config.max_frames,
            });
        }
        if let Some(frame) = set
            .iter()
            .find(|frame| frame.len() > self.config.max_payload_size)
        {
            return Err(FrameError::PayloadTooLarge {
                size: frame.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame_set(set, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if self.retry_would_block(&err) => continue,
                Err(err) if self.is_write_timeout(&err) && keep_waiting() => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush_with(&mut keep_waiting)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_with(&mut || false)
    }

    fn flush_with<F>(&mut self, keep_waiting: &mut F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if self.retry_would_block(&err) => continue,
                Err(err) if self.is_write_timeout(&err) && keep_waiting() => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// `WouldBlock` is a timeout when a write timeout is configured; otherwise
    /// the stream is merely busy and the write is retried.
    fn retry_would_block(&self, err: &std::io::Error) -> bool {
        err.kind() == ErrorKind::WouldBlock && self.config.write_timeout.is_none()
    }

    fn is_write_timeout(&self, err: &std::io::Error) -> bool {
        self.config.write_timeout.is_some()
            && matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<WireStream> {
    /// Create a frame writer for a `WireStream` and apply write timeout from config.
    pub fn with_config_stream(inner: WireStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
