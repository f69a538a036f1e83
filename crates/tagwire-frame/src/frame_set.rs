use std::ops::Index;

use bytes::Bytes;

use crate::codec::HEADER_SIZE;
use crate::error::{FrameError, Result};

/// One opaque byte buffer; the atomic unit of transmission.
pub type Frame = Bytes;

/// An ordered, non-empty sequence of frames sent or received as one message.
///
/// The transport delivers a frame set whole or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<Frame>,
}

impl FrameSet {
    /// Create a frame set holding a single frame.
    pub fn new(first: impl Into<Frame>) -> Self {
        Self {
            frames: vec![first.into()],
        }
    }

    /// Build a frame set from an ordered list of frames.
    ///
    /// Returns [`FrameError::EmptyFrameSet`] for an empty list.
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(FrameError::EmptyFrameSet);
        }
        Ok(Self { frames })
    }

    /// Append a frame.
    pub fn push(&mut self, frame: impl Into<Frame>) {
        self.frames.push(frame.into());
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, frame: impl Into<Frame>) -> Self {
        self.push(frame);
        self
    }

    /// Number of frames (always at least one).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The first frame.
    pub fn first(&self) -> &Frame {
        &self.frames[0]
    }

    /// Frame at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Every frame after the first.
    pub fn rest(&self) -> &[Frame] {
        &self.frames[1..]
    }

    /// Iterate over all frames in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Consume the set and return its frames.
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Sum of frame payload sizes.
    pub fn payload_bytes(&self) -> usize {
        self.frames.iter().map(Bytes::len).sum()
    }

    /// Total wire size of this frame set (part headers + payloads).
    pub fn wire_size(&self) -> usize {
        self.frames.len() * HEADER_SIZE + self.payload_bytes()
    }
}

impl Index<usize> for FrameSet {
    type Output = Frame;

    fn index(&self, index: usize) -> &Frame {
        &self.frames[index]
    }
}

impl<'a> IntoIterator for &'a FrameSet {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl IntoIterator for FrameSet {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}
