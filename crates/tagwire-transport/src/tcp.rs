use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::traits::WireStream;

/// TCP listener.
///
/// The listening socket is non-blocking so a poll loop can interleave
/// accepts with cancellation checks.
pub struct TcpSocket {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpSocket {
    /// Bind a non-blocking listener on a TCP endpoint.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let bind_err = |source: std::io::Error| TransportError::Bind {
            endpoint: endpoint.to_string(),
            source,
        };

        let addrs = endpoint.bind_addrs()?;
        let listener = TcpListener::bind(addrs.as_slice()).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        info!(%endpoint, %local_addr, "listening on tcp");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept a pending connection without blocking.
    ///
    /// Returns `Ok(None)` when no client is waiting.
    pub fn try_accept(&self) -> Result<Option<WireStream>> {
        match self.listener.accept() {
            Ok((stream, addr)) => {
                debug!(%addr, "accepted tcp connection");
                WireStream::from_tcp(stream).map(Some)
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
            Err(err) => Err(TransportError::Accept(err)),
        }
    }

    /// Connect to a TCP endpoint (blocking).
    pub fn connect(endpoint: &Endpoint) -> Result<WireStream> {
        let addrs = endpoint.connect_addrs()?;
        let stream =
            TcpStream::connect(addrs.as_slice()).map_err(|source| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        debug!(%endpoint, "connected to tcp endpoint");
        WireStream::from_tcp(stream)
    }

    /// The address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::time::{Duration, Instant};

    #[test]
    fn bind_ephemeral_accept_connect() {
        let listener = TcpSocket::bind(&Endpoint::tcp("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().port();
        assert_ne!(port, 0);

        let client = std::thread::spawn(move || {
            let mut stream = TcpSocket::connect(&Endpoint::tcp("127.0.0.1", port)).unwrap();
            stream.write_all(b"ping").unwrap();
        });

        let start = Instant::now();
        let mut server = loop {
            if let Some(stream) = listener.try_accept().unwrap() {
                break stream;
            }
            assert!(start.elapsed() < Duration::from_secs(3), "accept timed out");
            std::thread::sleep(Duration::from_millis(5));
        };

        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        client.join().unwrap();
    }

    #[test]
    fn try_accept_idle_returns_none() {
        let listener = TcpSocket::bind(&Endpoint::tcp("127.0.0.1", 0)).unwrap();
        assert!(listener.try_accept().unwrap().is_none());
    }

    #[test]
    fn connect_refused_reports_endpoint() {
        let port = {
            let probe = TcpSocket::bind(&Endpoint::tcp("127.0.0.1", 0)).unwrap();
            probe.local_addr().port()
        };
        let err = TcpSocket::connect(&Endpoint::tcp("127.0.0.1", port)).unwrap_err();
        match err {
            TransportError::Connect { endpoint, .. } => {
                assert_eq!(endpoint, format!("tcp://127.0.0.1:{port}"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bind_twice_fails() {
        let first = TcpSocket::bind(&Endpoint::tcp("127.0.0.1", 0)).unwrap();
        let port = first.local_addr().port();
        let second = TcpSocket::bind(&Endpoint::tcp("127.0.0.1", port));
        assert!(matches!(second, Err(TransportError::Bind { .. })));
    }
}
