/// Errors produced while encoding or decoding protocol payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// A value could not be encoded to its canonical binary form.
    #[error("payload encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Payload bytes are not a valid encoding of the expected type.
    #[error("payload decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A text payload is not valid UTF-8.
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// A request kind name did not match any known kind.
    #[error("unknown request kind {0:?}")]
    UnknownKind(String),
}

pub type Result<T> = std::result::Result<T, ProtoError>;
