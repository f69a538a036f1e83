//! Request client with reply shape validation.
//!
//! A reply is accepted only when its tag echoes the request's kind and its
//! frame count fits the kind. Typed calls turn a rejected reply, or a peer
//! that hangs up without replying, into the empty value (`""` or an empty
//! list); [`ExchangeClient::call`] exposes the rejection or the
//! [`ExchangeError::Disconnected`] instead.

use std::fmt;

use tagwire_frame::FrameSet;
use tagwire_proto::{
    decode_tag, deserialize_each, deserialize_list, deserialize_status, encode_tag,
    serialize_each, serialize_list, Envelope, MeteoriteLanding, ProtoError, RequestKind, TAG_SIZE,
};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ExchangeError, Result};
use crate::socket::RequestSocket;

/// Frame count a reply must have, tag included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedFrames {
    Exactly(usize),
    AtLeast(usize),
}

impl ExpectedFrames {
    /// Reply shape for a request of `kind`.
    pub fn for_kind(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Unspecified => Self::Exactly(1),
            RequestKind::GetLargePayloadMultipart => Self::AtLeast(2),
            RequestKind::GetSmallPayload
            | RequestKind::GetLargePayload
            | RequestKind::PostLargePayload
            | RequestKind::PostLargePayloadMultipart => Self::Exactly(2),
        }
    }

    pub fn matches(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for ExpectedFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Why a reply was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeViolation {
    /// Frame 0 does not echo the requested kind.
    TagMismatch {
        expected: RequestKind,
        actual: RequestKind,
    },
    /// The tag matched but the frame count does not fit the kind.
    FrameCount {
        kind: RequestKind,
        expected: ExpectedFrames,
        actual: usize,
    },
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagMismatch { expected, actual } => {
                write!(f, "reply tag {actual} does not echo request {expected}")
            }
            Self::FrameCount {
                kind,
                expected,
                actual,
            } => write!(f, "{kind} reply has {actual} frames, expected {expected}"),
        }
    }
}

/// Outcome of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Accepted(Envelope),
    Rejected(ShapeViolation),
}

impl Reply {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Reply::Accepted(_))
    }

    /// The accepted envelope, if any.
    pub fn accepted(self) -> Option<Envelope> {
        match self {
            Reply::Accepted(envelope) => Some(envelope),
            Reply::Rejected(_) => None,
        }
    }
}

/// Check a raw reply against the shape expected for `kind`.
///
/// Frame 0 must be exactly the four tag bytes of `kind`, so a garbled tag
/// never matches even when the request was `Unspecified`.
pub fn validate(
    kind: RequestKind,
    reply: &FrameSet,
) -> std::result::Result<Envelope, ShapeViolation> {
    let tag = reply.first();
    if tag[..] != encode_tag(kind)[..] {
        let actual = if tag.len() == TAG_SIZE {
            decode_tag(tag)
        } else {
            RequestKind::Unspecified
        };
        return Err(ShapeViolation::TagMismatch {
            expected: kind,
            actual,
        });
    }
    let expected = ExpectedFrames::for_kind(kind);
    if !expected.matches(reply.len()) {
        return Err(ShapeViolation::FrameCount {
            kind,
            expected,
            actual: reply.len(),
        });
    }
    Ok(Envelope::from_frame_set(reply))
}

/// Synchronous request/reply client.
///
/// One request is in flight at a time. After a timeout or connection fault
/// the connection is dropped and re-established on the next call, so a late
/// reply is never read as the answer to a later request.
pub struct ExchangeClient {
    config: ClientConfig,
    socket: Option<RequestSocket>,
}

impl ExchangeClient {
    /// Connect to the configured endpoint.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let socket = RequestSocket::connect(&config.endpoint, config.frame.clone())?;
        Ok(Self {
            config,
            socket: Some(socket),
        })
    }

    /// Fetch the server's API version string.
    pub fn get_small_payload(&mut self) -> Result<String> {
        let Some(reply) = self.call_typed(Envelope::new(RequestKind::GetSmallPayload))? else {
            return Ok(String::new());
        };
        let text = String::from_utf8(reply.payload()[0].to_vec()).map_err(ProtoError::from)?;
        Ok(text)
    }

    /// Fetch every record as one bulk blob.
    pub fn get_large_payload(&mut self) -> Result<Vec<MeteoriteLanding>> {
        let Some(reply) = self.call_typed(Envelope::new(RequestKind::GetLargePayload))? else {
            return Ok(Vec::new());
        };
        Ok(deserialize_list(&reply.payload()[0])?)
    }

    /// Upload `records` as one bulk blob; returns the server's status.
    pub fn post_large_payload(&mut self, records: &[MeteoriteLanding]) -> Result<String> {
        let request =
            Envelope::new(RequestKind::PostLargePayload).with_payload(serialize_list(records)?);
        self.call_status(request)
    }

    /// Fetch every record, one frame per record.
    pub fn get_large_payload_multipart(&mut self) -> Result<Vec<MeteoriteLanding>> {
        let Some(reply) =
            self.call_typed(Envelope::new(RequestKind::GetLargePayloadMultipart))?
        else {
            return Ok(Vec::new());
        };
        Ok(deserialize_each(reply.payload())?)
    }

    /// Upload `records` one frame per record; returns the server's status.
    pub fn post_large_payload_multipart(
        &mut self,
        records: &[MeteoriteLanding],
    ) -> Result<String> {
        let request = Envelope::new(RequestKind::PostLargePayloadMultipart)
            .with_payloads(serialize_each(records)?);
        self.call_status(request)
    }

    /// Send `request` and validate the reply against its kind.
    pub fn call(&mut self, request: Envelope) -> Result<Reply> {
        let kind = request.kind();
        let raw = self.exchange(request.into_frame_set())?;
        Ok(match validate(kind, &raw) {
            Ok(envelope) => Reply::Accepted(envelope),
            Err(violation) => Reply::Rejected(violation),
        })
    }

    /// Send a raw frame set and return the raw reply, without validation.
    pub fn exchange(&mut self, request: FrameSet) -> Result<FrameSet> {
        let timeout = self.config.request_timeout;
        let frames = request.len();
        let kind = decode_tag(request.first());

        let socket = self.socket()?;
        let outcome = socket
            .try_send(&request)
            .and_then(|()| socket.try_receive(timeout));

        match outcome {
            Ok(Some(reply)) => {
                debug!(kind = %kind, sent = frames, received = reply.len(), "exchange complete");
                Ok(reply)
            }
            Ok(None) => {
                let waited = timeout.unwrap_or_default();
                self.reset(&format!("no reply within {waited:?}"));
                Err(ExchangeError::Timeout(waited))
            }
            Err(err) => {
                self.reset(&err.to_string());
                Err(err)
            }
        }
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Close the connection.
    pub fn close(mut self) {
        if let Some(socket) = self.socket.take() {
            socket.close();
        }
    }

    fn call_typed(&mut self, request: Envelope) -> Result<Option<Envelope>> {
        match self.call(request) {
            Ok(Reply::Accepted(envelope)) => Ok(Some(envelope)),
            Ok(Reply::Rejected(violation)) => {
                warn!(%violation, "reply rejected; returning empty result");
                Ok(None)
            }
            Err(ExchangeError::Disconnected(reason)) => {
                warn!(%reason, "no reply received; returning empty result");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn call_status(&mut self, request: Envelope) -> Result<String> {
        let Some(reply) = self.call_typed(request)? else {
            return Ok(String::new());
        };
        Ok(deserialize_status(&reply.payload()[0])?.status)
    }

    fn socket(&mut self) -> Result<&mut RequestSocket> {
        if self.socket.is_none() {
            debug!(endpoint = %self.config.endpoint, "reconnecting");
            let socket = RequestSocket::connect(&self.config.endpoint, self.config.frame.clone())?;
            self.socket = Some(socket);
        }
        self.socket
            .as_mut()
            .ok_or_else(|| ExchangeError::Disconnected("no connection".to_string()))
    }

    fn reset(&mut self, reason: &str) {
        if let Some(socket) = self.socket.take() {
            warn!(endpoint = %socket.endpoint(), reason, "dropping connection");
            socket.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(kind: RequestKind) -> FrameSet {
        FrameSet::new(encode_tag(kind).to_vec())
    }

    #[test]
    fn accepts_matching_single_payload() {
        let reply = tag(RequestKind::GetSmallPayload).with("API Version 1.0");
        let envelope = validate(RequestKind::GetSmallPayload, &reply).unwrap();
        assert_eq!(envelope.payload()[0].as_ref(), b"API Version 1.0");
    }

    #[test]
    fn rejects_wrong_tag() {
        let reply = tag(RequestKind::GetLargePayload).with("blob");
        assert_eq!(
            validate(RequestKind::GetSmallPayload, &reply),
            Err(ShapeViolation::TagMismatch {
                expected: RequestKind::GetSmallPayload,
                actual: RequestKind::GetLargePayload,
            })
        );

        let mut long_tag = encode_tag(RequestKind::GetSmallPayload).to_vec();
        long_tag.push(0);
        let reply = FrameSet::new(long_tag).with("API Version 1.0");
        assert_eq!(
            validate(RequestKind::GetSmallPayload, &reply),
            Err(ShapeViolation::TagMismatch {
                expected: RequestKind::GetSmallPayload,
                actual: RequestKind::Unspecified,
            })
        );
    }

    #[test]
    fn rejects_wrong_frame_count() {
        let reply = tag(RequestKind::GetSmallPayload).with("a").with("b");
        assert!(matches!(
            validate(RequestKind::GetSmallPayload, &reply),
            Err(ShapeViolation::FrameCount { actual: 3, .. })
        ));

        let tag_only = tag(RequestKind::PostLargePayload);
        assert!(matches!(
            validate(RequestKind::PostLargePayload, &tag_only),
            Err(ShapeViolation::FrameCount { actual: 1, .. })
        ));
    }

    #[test]
    fn multipart_accepts_any_count_from_two() {
        let kind = RequestKind::GetLargePayloadMultipart;
        assert!(validate(kind, &tag(kind)).is_err());
        assert!(validate(kind, &tag(kind).with("r1")).is_ok());
        assert!(validate(kind, &tag(kind).with("r1").with("r2").with("r3")).is_ok());
    }

    #[test]
    fn garbled_tag_never_matches() {
        let reply = FrameSet::new(vec![0xFFu8]);
        assert!(matches!(
            validate(RequestKind::Unspecified, &reply),
            Err(ShapeViolation::TagMismatch { .. })
        ));
    }

    #[test]
    fn unspecified_expects_single_frame() {
        assert!(validate(RequestKind::Unspecified, &tag(RequestKind::Unspecified)).is_ok());
    }

    #[test]
    fn violation_messages_are_readable() {
        let violation = ShapeViolation::FrameCount {
            kind: RequestKind::GetLargePayloadMultipart,
            expected: ExpectedFrames::AtLeast(2),
            actual: 1,
        };
        assert_eq!(
            violation.to_string(),
            "get-large-payload-multipart reply has 1 frames, expected at least 2"
        );
    }
}
