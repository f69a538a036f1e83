//! Endpoint addresses.
//!
//! Endpoints are written as URLs:
//! - `tcp://host:port`: TCP; `*` as host binds every interface.
//! - `ipc:///path/to.sock`: Unix domain socket at a filesystem path.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Default endpoint a server binds when none is configured.
pub const DEFAULT_BIND_ENDPOINT: &str = "tcp://*:5555";

/// Default endpoint a client connects to when none is configured.
pub const DEFAULT_CONNECT_ENDPOINT: &str = "tcp://localhost:5555";

const TCP_SCHEME: &str = "tcp://";
const IPC_SCHEME: &str = "ipc://";
const WILDCARD_HOST: &str = "*";

/// A transport address both ends agree on out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// TCP host and port. Host `*` means all interfaces (bind only).
    Tcp { host: String, port: u16 },
    /// Unix domain socket path.
    Unix(PathBuf),
}

impl Endpoint {
    /// TCP endpoint.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Unix domain socket endpoint.
    pub fn unix(path: impl AsRef<Path>) -> Self {
        Self::Unix(path.as_ref().to_path_buf())
    }

    /// Scheme name for diagnostics.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp { .. } => "tcp",
            Self::Unix(_) => "ipc",
        }
    }

    /// Whether the host is the bind wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Tcp { host, .. } if host == WILDCARD_HOST)
    }

    /// Resolve a TCP endpoint to socket addresses for binding.
    ///
    /// The wildcard host resolves to `0.0.0.0`.
    pub(crate) fn bind_addrs(&self) -> Result<Vec<SocketAddr>> {
        match self {
            Self::Tcp { host, port } if host == WILDCARD_HOST => {
                Ok(vec![SocketAddr::from(([0, 0, 0, 0], *port))])
            }
            Self::Tcp { .. } => self.resolve(),
            Self::Unix(_) => Err(self.not_tcp()),
        }
    }

    /// Resolve a TCP endpoint to socket addresses for connecting.
    pub(crate) fn connect_addrs(&self) -> Result<Vec<SocketAddr>> {
        match self {
            Self::Tcp { .. } if self.is_wildcard() => Err(TransportError::InvalidEndpoint {
                endpoint: self.to_string(),
                reason: "wildcard host is only valid for bind".to_string(),
            }),
            Self::Tcp { .. } => self.resolve(),
            Self::Unix(_) => Err(self.not_tcp()),
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let Self::Tcp { host, port } = self else {
            return Err(self.not_tcp());
        };
        let addrs: Vec<SocketAddr> = (host.as_str(), *port)
            .to_socket_addrs()
            .map_err(|err| TransportError::InvalidEndpoint {
                endpoint: self.to_string(),
                reason: err.to_string(),
            })?
            .collect();
        if addrs.is_empty() {
            return Err(TransportError::InvalidEndpoint {
                endpoint: self.to_string(),
                reason: "host resolved to no addresses".to_string(),
            });
        }
        Ok(addrs)
    }

    fn not_tcp(&self) -> TransportError {
        TransportError::InvalidEndpoint {
            endpoint: self.to_string(),
            reason: "not a tcp endpoint".to_string(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            endpoint: input.to_string(),
            reason: reason.to_string(),
        };

        if let Some(rest) = input.strip_prefix(TCP_SCHEME) {
            let (host, port) = rest
                .rsplit_once(':')
                .ok_or_else(|| invalid("expected host:port"))?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            if host.is_empty() {
                return Err(invalid("host must not be empty"));
            }
            let port: u16 = port.parse().map_err(|_| invalid("invalid port"))?;
            return Ok(Self::tcp(host, port));
        }

        if let Some(path) = input.strip_prefix(IPC_SCHEME) {
            if path.is_empty() {
                return Err(invalid("socket path must not be empty"));
            }
            return Ok(Self::unix(path));
        }

        Err(invalid("expected tcp:// or ipc:// scheme"))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{host}]:{port}"),
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Unix(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::tcp(addr.ip().to_string(), addr.port())
    }
}
