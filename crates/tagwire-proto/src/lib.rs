//! The tagwire message convention.
//!
//! Every message is a frame set whose first frame is a 4-byte little-endian
//! [`RequestKind`] tag. Replies echo the request's tag. Payload frames carry
//! either UTF-8 text, one bulk record list, one record per frame, or a
//! status acknowledgment.

pub mod envelope;
pub mod error;
pub mod kind;
pub mod record;
pub mod serializer;

pub use envelope::Envelope;
pub use error::{ProtoError, Result};
pub use kind::{decode_tag, encode_tag, RequestKind, TAG_SIZE};
pub use record::{
    GeoLocation, MeteoriteLanding, MeteoriteLandingList, StatusResponse, STATUS_SUCCESS,
};
pub use serializer::{
    deserialize, deserialize_each, deserialize_list, deserialize_status, serialize,
    serialize_each, serialize_list, serialize_status, RecordCodec,
};
