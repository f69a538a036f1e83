//! Stream transport for tagwire.
//!
//! Provides a unified interface over the connection-oriented transports a
//! tagwire endpoint can name:
//! - TCP (`tcp://host:port`)
//! - Unix domain sockets (`ipc:///path`, Unix only)
//!
//! This is the lowest layer. Everything else builds on top of the
//! [`WireStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use endpoint::{Endpoint, DEFAULT_BIND_ENDPOINT, DEFAULT_CONNECT_ENDPOINT};
pub use error::{Result, TransportError};
pub use listener::{connect, Listener};
pub use tcp::TcpSocket;
pub use traits::WireStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
