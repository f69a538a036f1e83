use bytes::Bytes;
use tagwire_frame::FrameSet;

use crate::kind::{decode_tag, encode_tag, RequestKind};

/// Logical view of a frame set: a request kind tag plus payload frames.
///
/// Frame 0 on the wire is always the 4-byte tag; frames 1.. are payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    kind: RequestKind,
    payload: Vec<Bytes>,
}

impl Envelope {
    /// An envelope carrying only a tag.
    pub fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            payload: Vec::new(),
        }
    }

    /// Append one payload frame.
    pub fn with_payload(mut self, frame: impl Into<Bytes>) -> Self {
        self.payload.push(frame.into());
        self
    }

    /// Append payload frames in order.
    pub fn with_payloads<I>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        self.payload.extend(frames);
        self
    }

    /// Decode the tag of a received frame set.
    ///
    /// A garbled tag frame decodes as [`RequestKind::Unspecified`].
    pub fn from_frame_set(set: &FrameSet) -> Self {
        Self {
            kind: decode_tag(set.first()),
            payload: set.rest().to_vec(),
        }
    }

    /// The request kind carried in the tag frame.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Payload frames (everything after the tag).
    pub fn payload(&self) -> &[Bytes] {
        &self.payload
    }

    /// Number of frames on the wire, tag included.
    pub fn frame_count(&self) -> usize {
        1 + self.payload.len()
    }

    /// Encode as a frame set: tag first, then payload frames.
    pub fn into_frame_set(self) -> FrameSet {
        let mut set = FrameSet::new(Bytes::copy_from_slice(&encode_tag(self.kind)));
        for frame in self.payload {
            set.push(frame);
        }
        set
    }
}

impl From<&FrameSet> for Envelope {
    fn from(set: &FrameSet) -> Self {
        Self::from_frame_set(set)
    }
}

impl From<Envelope> for FrameSet {
    fn from(envelope: Envelope) -> Self {
        envelope.into_frame_set()
    }
}
