//! Tagged multipart request/reply messaging.
//!
//! A request is a frame set whose first frame is a 4-byte request kind tag;
//! the reply echoes the tag and carries text, a bulk record blob, one record
//! per frame, or a status acknowledgment.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP and Unix domain socket streams, endpoint parsing
//! - [`frame`]: Multipart frame sets over a byte stream
//! - [`proto`]: Request kinds, tag codec, records and their binary form
//! - [`exchange`]: Reply server, dispatch table and validating client (behind `exchange` feature)

/// Re-export transport types.
pub mod transport {
    pub use tagwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tagwire_frame::*;
}

/// Re-export protocol types.
pub mod proto {
    pub use tagwire_proto::*;
}

/// Re-export exchange types (requires `exchange` feature).
#[cfg(feature = "exchange")]
pub mod exchange {
    pub use tagwire_exchange::*;
}
