//! Request kinds and the 4-byte tag frame that carries them.
//!
//! The integer value of each kind is the wire contract. New kinds are
//! appended; existing values are never renumbered.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::ProtoError;

/// Size of an encoded tag frame.
pub const TAG_SIZE: usize = 4;

/// Identifies what a request asks for; echoed as frame 0 of the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum RequestKind {
    #[default]
    Unspecified = 0,
    GetSmallPayload = 1,
    GetLargePayload = 2,
    PostLargePayload = 3,
    GetLargePayloadMultipart = 4,
    PostLargePayloadMultipart = 5,
}

impl RequestKind {
    /// Every kind a server answers with a payload, in wire order.
    pub const ALL: [RequestKind; 5] = [
        RequestKind::GetSmallPayload,
        RequestKind::GetLargePayload,
        RequestKind::PostLargePayload,
        RequestKind::GetLargePayloadMultipart,
        RequestKind::PostLargePayloadMultipart,
    ];

    /// Map a wire integer to a kind, or `None` if it is not a known value.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::GetSmallPayload),
            2 => Some(Self::GetLargePayload),
            3 => Some(Self::PostLargePayload),
            4 => Some(Self::GetLargePayloadMultipart),
            5 => Some(Self::PostLargePayloadMultipart),
            _ => None,
        }
    }

    /// Wire integer of this kind.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Kebab-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::GetSmallPayload => "get-small-payload",
            Self::GetLargePayload => "get-large-payload",
            Self::PostLargePayload => "post-large-payload",
            Self::GetLargePayloadMultipart => "get-large-payload-multipart",
            Self::PostLargePayloadMultipart => "post-large-payload-multipart",
        }
    }

    /// Whether records travel one per frame for this kind.
    pub fn is_multipart(self) -> bool {
        matches!(
            self,
            Self::GetLargePayloadMultipart | Self::PostLargePayloadMultipart
        )
    }

    /// Whether the request carries a record payload and expects a status reply.
    pub fn is_post(self) -> bool {
        matches!(
            self,
            Self::PostLargePayload | Self::PostLargePayloadMultipart
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RequestKind {
    type Err = ProtoError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let wanted = input.trim().to_ascii_lowercase().replace('_', "-");
        std::iter::once(Self::Unspecified)
            .chain(Self::ALL)
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| ProtoError::UnknownKind(input.to_string()))
    }
}

/// Encode a kind as a 4-byte little-endian signed integer.
pub fn encode_tag(kind: RequestKind) -> [u8; TAG_SIZE] {
    kind.as_i32().to_le_bytes()
}

/// Decode a tag frame.
///
/// Never fails: an empty or short buffer, or a value outside the known
/// kinds, yields [`RequestKind::Unspecified`]. Only the first four bytes
/// of a longer buffer are read.
pub fn decode_tag(bytes: &[u8]) -> RequestKind {
    let Some(raw) = bytes.get(..TAG_SIZE) else {
        warn!(len = bytes.len(), "tag frame shorter than 4 bytes");
        return RequestKind::Unspecified;
    };
    let value = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    if bytes.len() > TAG_SIZE {
        debug!(len = bytes.len(), "tag frame longer than 4 bytes; trailing bytes ignored");
    }
    match RequestKind::from_i32(value) {
        Some(kind) => kind,
        None => {
            debug!(value, "unknown request kind");
            RequestKind::Unspecified
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_stable() {
        let values: Vec<i32> = std::iter::once(RequestKind::Unspecified)
            .chain(RequestKind::ALL)
            .map(RequestKind::as_i32)
            .collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn tag_is_little_endian() {
        assert_eq!(encode_tag(RequestKind::PostLargePayload), [3, 0, 0, 0]);
        assert_eq!(encode_tag(RequestKind::Unspecified), [0, 0, 0, 0]);
    }

    #[test]
    fn every_kind_survives_tag_roundtrip() {
        for kind in RequestKind::ALL {
            assert_eq!(decode_tag(&encode_tag(kind)), kind);
        }
    }

    #[test]
    fn short_or_empty_tag_is_unspecified() {
        assert_eq!(decode_tag(&[]), RequestKind::Unspecified);
        assert_eq!(decode_tag(&[1]), RequestKind::Unspecified);
        assert_eq!(decode_tag(&[1, 0, 0]), RequestKind::Unspecified);
    }

    #[test]
    fn out_of_range_tag_is_unspecified() {
        assert_eq!(decode_tag(&99i32.to_le_bytes()), RequestKind::Unspecified);
        assert_eq!(decode_tag(&(-1i32).to_le_bytes()), RequestKind::Unspecified);
        assert_eq!(decode_tag(&i32::MAX.to_le_bytes()), RequestKind::Unspecified);
    }

    #[test]
    fn long_tag_reads_first_four_bytes() {
        assert_eq!(decode_tag(&[2, 0, 0, 0, 0xFF]), RequestKind::GetLargePayload);
    }

    #[test]
    fn parses_names() {
        assert_eq!(
            "get-large-payload-multipart".parse::<RequestKind>().unwrap(),
            RequestKind::GetLargePayloadMultipart
        );
        assert_eq!(
            "POST_LARGE_PAYLOAD".parse::<RequestKind>().unwrap(),
            RequestKind::PostLargePayload
        );
        assert!(matches!(
            "get-everything".parse::<RequestKind>(),
            Err(ProtoError::UnknownKind(_))
        ));
    }

    #[test]
    fn classification() {
        assert!(RequestKind::GetLargePayloadMultipart.is_multipart());
        assert!(!RequestKind::GetLargePayload.is_multipart());
        assert!(RequestKind::PostLargePayloadMultipart.is_post());
        assert!(!RequestKind::GetSmallPayload.is_post());
    }
}
