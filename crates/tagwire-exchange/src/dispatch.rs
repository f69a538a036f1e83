//! Request routing: a table from [`RequestKind`] to reply-producing handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tagwire_frame::FrameSet;
use tagwire_proto::{
    serialize_each, serialize_list, serialize_status, Envelope, MeteoriteLanding, RequestKind,
    StatusResponse,
};
use tracing::debug;

use crate::error::Result;

/// Text returned for [`RequestKind::GetSmallPayload`].
pub const API_VERSION: &str = "API Version 1.0";

/// Produces the reply for one decoded request.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Envelope) -> FrameSet;
}

impl<F> Handler for F
where
    F: Fn(&Envelope) -> FrameSet + Send + Sync,
{
    fn handle(&self, request: &Envelope) -> FrameSet {
        self(request)
    }
}

/// Read-only record set served by the standard handlers.
///
/// Both wire forms are serialized once up front; cloning is cheap.
#[derive(Clone)]
pub struct Dataset {
    records: Arc<[MeteoriteLanding]>,
    bulk: Bytes,
    each: Arc<[Bytes]>,
}

impl Dataset {
    /// Serialize `records` in bulk and per-record form.
    pub fn new(records: Vec<MeteoriteLanding>) -> Result<Self> {
        let bulk = serialize_list(&records)?;
        let each = serialize_each(&records)?;
        Ok(Self {
            records: records.into(),
            bulk,
            each: each.into(),
        })
    }

    /// An empty dataset.
    pub fn empty() -> Result<Self> {
        Self::new(Vec::new())
    }

    pub fn records(&self) -> &[MeteoriteLanding] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Frames in the multipart reply for this dataset, tag included.
    pub fn multipart_frames(&self) -> usize {
        self.records.len() + 1
    }

    /// All records as one `MeteoriteLandingList` blob.
    pub fn bulk_blob(&self) -> &Bytes {
        &self.bulk
    }

    /// One blob per record, in dataset order.
    pub fn record_blobs(&self) -> &[Bytes] {
        &self.each
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("records", &self.records.len())
            .field("bulk_bytes", &self.bulk.len())
            .finish()
    }
}

/// Routes requests by tag. Unknown and unregistered kinds get a one-frame
/// reply carrying the `Unspecified` tag.
pub struct DispatchTable {
    handlers: HashMap<RequestKind, Box<dyn Handler>>,
    largest_reply: usize,
}

impl DispatchTable {
    /// A table with no handlers; every request gets the fallback reply.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            largest_reply: 1,
        }
    }

    /// The standard handler set serving `dataset`.
    pub fn standard(dataset: Dataset) -> Result<Self> {
        let status = serialize_status(&StatusResponse::success())?;

        let mut table = Self::new();
        table.largest_reply = dataset.multipart_frames().max(2);
        table.register(RequestKind::GetSmallPayload, |_: &Envelope| {
            Envelope::new(RequestKind::GetSmallPayload)
                .with_payload(API_VERSION)
                .into_frame_set()
        });

        let bulk = dataset.clone();
        table.register(RequestKind::GetLargePayload, move |_: &Envelope| {
            Envelope::new(RequestKind::GetLargePayload)
                .with_payload(bulk.bulk_blob().clone())
                .into_frame_set()
        });

        let each = dataset;
        table.register(RequestKind::GetLargePayloadMultipart, move |_: &Envelope| {
            Envelope::new(RequestKind::GetLargePayloadMultipart)
                .with_payloads(each.record_blobs().iter().cloned())
                .into_frame_set()
        });

        for kind in [
            RequestKind::PostLargePayload,
            RequestKind::PostLargePayloadMultipart,
        ] {
            let status = status.clone();
            table.register(kind, move |request: &Envelope| {
                debug!(
                    kind = %kind,
                    frames = request.payload().len(),
                    bytes = request.payload().iter().map(Bytes::len).sum::<usize>(),
                    "post payload received"
                );
                Envelope::new(kind)
                    .with_payload(status.clone())
                    .into_frame_set()
            });
        }

        Ok(table)
    }

    /// Register (or replace) the handler for `kind`.
    ///
    /// Handlers for [`RequestKind::Unspecified`] are never invoked.
    pub fn register<H>(&mut self, kind: RequestKind, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Frame count of the largest reply the standard handlers produce.
    ///
    /// Handlers added with [`DispatchTable::register`] are not accounted for.
    pub fn largest_reply(&self) -> usize {
        self.largest_reply
    }

    /// Whether a request of `kind` reaches a registered handler.
    pub fn handles(&self, kind: RequestKind) -> bool {
        kind != RequestKind::Unspecified && self.handlers.contains_key(&kind)
    }

    /// Produce the reply for `request`. Never fails.
    pub fn dispatch(&self, request: &FrameSet) -> FrameSet {
        let envelope = Envelope::from_frame_set(request);
        let kind = envelope.kind();
        match self.handlers.get(&kind) {
            Some(handler) if kind != RequestKind::Unspecified => handler.handle(&envelope),
            _ => {
                debug!(kind = %kind, frames = request.len(), "no handler; replying unspecified");
                Envelope::new(RequestKind::Unspecified).into_frame_set()
            }
        }
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<i32> = self.handlers.keys().map(|kind| kind.as_i32()).collect();
        kinds.sort_unstable();
        f.debug_struct("DispatchTable").field("kinds", &kinds).finish()
    }
}
