//! Canonical binary form of records.
//!
//! Records are MessagePack with named fields (`rmp_serde::to_vec_named`),
//! so a given value always encodes to the same bytes and decoding checks
//! field names rather than positions.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::record::{MeteoriteLanding, MeteoriteLandingList, StatusResponse};

/// MessagePack codec for record payloads.
pub struct RecordCodec;

impl RecordCodec {
    /// Encode a value to its canonical bytes.
    #[inline]
    pub fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
        Ok(Bytes::from(rmp_serde::to_vec_named(value)?))
    }

    /// Decode canonical bytes. Fails on any malformed or mistyped input.
    #[inline]
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Serialize one record.
pub fn serialize(record: &MeteoriteLanding) -> Result<Bytes> {
    RecordCodec::encode(record)
}

/// Deserialize one record.
pub fn deserialize(bytes: &[u8]) -> Result<MeteoriteLanding> {
    RecordCodec::decode(bytes)
}

/// Serialize a record list as one bulk container blob.
pub fn serialize_list(records: &[MeteoriteLanding]) -> Result<Bytes> {
    #[derive(Serialize)]
    struct ListRef<'a> {
        meteorite_landings: &'a [MeteoriteLanding],
    }
    RecordCodec::encode(&ListRef {
        meteorite_landings: records,
    })
}

/// Deserialize a bulk container blob.
pub fn deserialize_list(bytes: &[u8]) -> Result<Vec<MeteoriteLanding>> {
    let list: MeteoriteLandingList = RecordCodec::decode(bytes)?;
    Ok(list.meteorite_landings)
}

/// Serialize each record independently, one blob per frame (multipart form).
pub fn serialize_each(records: &[MeteoriteLanding]) -> Result<Vec<Bytes>> {
    records.iter().map(serialize).collect()
}

/// Deserialize one record per frame, preserving order.
///
/// Stops at the first malformed frame; no partial list is returned.
pub fn deserialize_each<'a, I>(frames: I) -> Result<Vec<MeteoriteLanding>>
where
    I: IntoIterator<Item = &'a Bytes>,
{
    frames.into_iter().map(|frame| deserialize(frame)).collect()
}

/// Serialize a status acknowledgment.
pub fn serialize_status(status: &StatusResponse) -> Result<Bytes> {
    RecordCodec::encode(status)
}

/// Deserialize a status acknowledgment.
pub fn deserialize_status(bytes: &[u8]) -> Result<StatusResponse> {
    RecordCodec::decode(bytes)
}
