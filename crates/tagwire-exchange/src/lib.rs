//! Request/reply exchange engine.
//!
//! A server binds a [`ReplySocket`], decodes the tag of each request, routes
//! it through a [`DispatchTable`] and echoes the tag in the reply. A client
//! sends one request at a time and validates the reply shape before decoding.
//!
//! ```no_run
//! use tagwire_exchange::{
//!     ClientConfig, Dataset, DispatchTable, ExchangeClient, ExchangeServer, ServerConfig,
//! };
//!
//! # fn main() -> tagwire_exchange::Result<()> {
//! let table = DispatchTable::standard(Dataset::empty()?)?;
//! let mut server = ExchangeServer::new(ServerConfig::default(), table);
//! server.start()?;
//!
//! let mut client = ExchangeClient::connect(ClientConfig::default())?;
//! assert_eq!(client.get_small_payload()?, "API Version 1.0");
//!
//! server.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod server;
pub mod socket;

pub use client::{validate, ExchangeClient, ExpectedFrames, Reply, ShapeViolation};
pub use config::{ClientConfig, ServerConfig, DEFAULT_POLL_INTERVAL};
pub use dispatch::{Dataset, DispatchTable, Handler, API_VERSION};
pub use error::{ExchangeError, Result};
pub use server::ExchangeServer;
pub use socket::{ReplySocket, RequestSocket};
