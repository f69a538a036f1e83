use std::time::Duration;

/// Errors that can occur in exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Transport-level error (bind, connect, accept).
    #[error("transport error: {0}")]
    Transport(#[from] tagwire_transport::TransportError),

    /// Frame-level error on an established connection.
    #[error("frame error: {0}")]
    Frame(#[from] tagwire_frame::FrameError),

    /// A payload could not be encoded or decoded.
    #[error("payload error: {0}")]
    Proto(#[from] tagwire_proto::ProtoError),

    /// No reply arrived within the configured request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// There is no connection to send on or receive from.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// The socket has been closed.
    #[error("socket closed")]
    Closed,

    /// `start` was called on a running server.
    #[error("server is already running")]
    AlreadyRunning,

    /// `stop` was called on a stopped server.
    #[error("server is not running")]
    NotRunning,

    /// A standard reply would exceed the configured frame limit.
    #[error("dataset needs {frames} frames per reply, limit is {max}")]
    ReplyTooLarge { frames: usize, max: usize },

    /// The server worker thread could not be spawned or panicked.
    #[error("server worker failed: {0}")]
    Worker(String),
}

impl ExchangeError {
    /// Whether the error means the current connection is unusable.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            ExchangeError::Frame(_) | ExchangeError::Disconnected(_) | ExchangeError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
