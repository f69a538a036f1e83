use crate::endpoint::Endpoint;
#[cfg(not(unix))]
use crate::error::TransportError;
use crate::error::Result;
use crate::tcp::TcpSocket;
use crate::traits::WireStream;
#[cfg(unix)]
use crate::uds::UnixDomainSocket;

/// A bound listener for any supported endpoint scheme.
pub enum Listener {
    Tcp(TcpSocket),
    #[cfg(unix)]
    Unix(UnixDomainSocket),
}

impl Listener {
    /// Bind a non-blocking listener on `endpoint`.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp { .. } => TcpSocket::bind(endpoint).map(Self::Tcp),
            #[cfg(unix)]
            Endpoint::Unix(path) => UnixDomainSocket::bind(path).map(Self::Unix),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(TransportError::Unsupported(endpoint.to_string())),
        }
    }

    /// Accept a pending connection, or `Ok(None)` if none is waiting.
    pub fn try_accept(&self) -> Result<Option<WireStream>> {
        match self {
            Self::Tcp(socket) => socket.try_accept(),
            #[cfg(unix)]
            Self::Unix(socket) => socket.try_accept(),
        }
    }

    /// The endpoint clients should connect to.
    ///
    /// For TCP this reports the concrete bound address, so a listener bound
    /// to port 0 yields the assigned port.
    pub fn local_endpoint(&self) -> Endpoint {
        match self {
            Self::Tcp(socket) => Endpoint::from(socket.local_addr()),
            #[cfg(unix)]
            Self::Unix(socket) => Endpoint::unix(socket.path()),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Tcp(_) => "tcp",
            #[cfg(unix)]
            Self::Unix(_) => "unix-domain-socket",
        }
    }
}

/// Connect to `endpoint` (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<WireStream> {
    match endpoint {
        Endpoint::Tcp { .. } => TcpSocket::connect(endpoint),
        #[cfg(unix)]
        Endpoint::Unix(path) => UnixDomainSocket::connect(path),
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(TransportError::Unsupported(endpoint.to_string())),
    }
}
