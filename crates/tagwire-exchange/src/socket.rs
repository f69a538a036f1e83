//! Message-level sockets over a stream transport.
//!
//! [`ReplySocket`] is the serving side: it owns a non-blocking listener and at
//! most one connection, and receives with a bounded wait so its owner can
//! interleave cancellation checks. [`RequestSocket`] is the calling side.

use std::thread;
use std::time::{Duration, Instant};

use tagwire_frame::{FrameConfig, FrameError, FrameReader, FrameSet, FrameWriter};
use tagwire_transport::{Endpoint, Listener, WireStream};
use tracing::{debug, info};

use crate::error::{ExchangeError, Result};

/// Longest single sleep while waiting for a connection.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(1);

/// Smallest read timeout handed to the OS; zero would mean "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

struct Connection {
    peer: String,
    reader: FrameReader<WireStream>,
    writer: FrameWriter<WireStream>,
}

impl Connection {
    fn open(stream: WireStream, config: &FrameConfig) -> Result<Self> {
        let peer = stream.peer_label();
        let reader_stream = stream.try_clone()?;
        Ok(Self {
            peer,
            reader: FrameReader::with_config_stream(reader_stream, config.clone())?,
            writer: FrameWriter::with_config_stream(stream, config.clone())?,
        })
    }

    fn close(self) {
        self.writer.get_ref().shutdown();
    }
}

/// Serving side of a request/reply exchange.
pub struct ReplySocket {
    listener: Option<Listener>,
    connection: Option<Connection>,
    endpoint: Endpoint,
    config: FrameConfig,
}

impl ReplySocket {
    /// Bind to `endpoint`.
    ///
    /// For TCP endpoints with port 0 the assigned port is reported by
    /// [`ReplySocket::local_endpoint`].
    pub fn bind(endpoint: &Endpoint, config: FrameConfig) -> Result<Self> {
        let listener = Listener::bind(endpoint)?;
        let local = listener.local_endpoint();
        info!(
            endpoint = %local,
            transport = listener.transport_name(),
            "reply socket bound"
        );
        Ok(Self {
            listener: Some(listener),
            connection: None,
            endpoint: local,
            config,
        })
    }

    /// Wait up to `timeout` for one complete request.
    ///
    /// Returns `Ok(None)` when nothing arrived in time or the peer hung up.
    /// A corrupt stream drops the connection and is reported as an error;
    /// the socket keeps accepting afterwards.
    pub fn try_receive(&mut self, timeout: Duration) -> Result<Option<FrameSet>> {
        let deadline = Instant::now() + timeout;

        if self.connection.is_none() && !self.accept_until(deadline)? {
            return Ok(None);
        }
        let Some(connection) = self.connection.as_mut() else {
            return Ok(None);
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        connection
            .reader
            .set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT)))?;

        match connection.reader.read_frame_set() {
            Ok(set) => Ok(Some(set)),
            Err(err) if err.is_timeout() => Ok(None),
            Err(FrameError::ConnectionClosed) => {
                self.drop_connection("peer closed");
                Ok(None)
            }
            Err(err) => {
                self.drop_connection("stream fault");
                Err(err.into())
            }
        }
    }

    /// Send one reply on the current connection.
    pub fn try_send(&mut self, set: &FrameSet) -> Result<()> {
        self.try_send_with(set, || false)
    }

    /// Send one reply, asking `keep_waiting` whether to continue each time
    /// the write timeout expires with the peer not reading.
    ///
    /// A reply that is abandoned part-way drops the connection.
    pub fn try_send_with<F>(&mut self, set: &FrameSet, keep_waiting: F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ExchangeError::Disconnected(
                "no request is awaiting a reply".to_string(),
            ));
        };
        if let Err(err) = connection.writer.write_frame_set_with(set, keep_waiting) {
            self.drop_connection("write failed");
            return Err(err.into());
        }
        Ok(())
    }

    /// Drop the current connection without replying.
    pub fn disconnect(&mut self) {
        self.drop_connection("disconnected by server");
    }

    /// Release the connection and the listener.
    ///
    /// Unix socket files are removed when the listener is dropped.
    pub fn close(&mut self) {
        self.drop_connection("socket closing");
        if self.listener.take().is_some() {
            info!(endpoint = %self.endpoint, "reply socket closed");
        }
    }

    /// Whether [`ReplySocket::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.listener.is_none()
    }

    /// Whether a client is currently connected.
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// The endpoint clients should connect to.
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Poll the listener until a connection arrives or `deadline` passes.
    fn accept_until(&mut self, deadline: Instant) -> Result<bool> {
        let listener = self.listener.as_ref().ok_or(ExchangeError::Closed)?;
        loop {
            if let Some(stream) = listener.try_accept()? {
                let connection = Connection::open(stream, &self.config)?;
                debug!(peer = %connection.peer, "client connected");
                self.connection = Some(connection);
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::sleep((deadline - now).min(ACCEPT_BACKOFF));
        }
    }

    fn drop_connection(&mut self, reason: &str) {
        if let Some(connection) = self.connection.take() {
            debug!(peer = %connection.peer, reason, "client connection dropped");
            connection.close();
        }
    }
}

impl Drop for ReplySocket {
    fn drop(&mut self) {
        self.close();
    }
}

/// Calling side of a request/reply exchange.
pub struct RequestSocket {
    endpoint: Endpoint,
    connection: Connection,
}

impl RequestSocket {
    /// Connect to `endpoint` (blocking).
    pub fn connect(endpoint: &Endpoint, config: FrameConfig) -> Result<Self> {
        let stream = tagwire_transport::connect(endpoint)?;
        let connection = Connection::open(stream, &config)?;
        debug!(endpoint = %endpoint, "request socket connected");
        Ok(Self {
            endpoint: endpoint.clone(),
            connection,
        })
    }

    /// Send one request.
    pub fn try_send(&mut self, set: &FrameSet) -> Result<()> {
        self.connection.writer.write_frame_set(set)?;
        Ok(())
    }

    /// Wait for one reply.
    ///
    /// With `None` this blocks until a reply arrives or the connection ends.
    /// `Ok(None)` means the timeout elapsed first.
    pub fn try_receive(&mut self, timeout: Option<Duration>) -> Result<Option<FrameSet>> {
        let timeout = timeout.map(|t| t.max(MIN_READ_TIMEOUT));
        if self.connection.reader.config().read_timeout != timeout {
            self.connection.reader.set_read_timeout(timeout)?;
        }
        match self.connection.reader.read_frame_set() {
            Ok(set) => Ok(Some(set)),
            Err(err) if timeout.is_some() && err.is_timeout() => Ok(None),
            Err(FrameError::ConnectionClosed) => Err(ExchangeError::Disconnected(format!(
                "{} closed the connection",
                self.endpoint
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// The endpoint this socket is connected to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Shut the connection down.
    pub fn close(self) {
        debug!(endpoint = %self.endpoint, "request socket closed");
        self.connection.close();
    }
}
