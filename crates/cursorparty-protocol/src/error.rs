//! Error types for the protocol layer.
//!
//! Each crate in cursorparty defines its own error enum. A `ProtocolError`
//! always means the bytes themselves were wrong: bad frame shape, bad
//! protobuf, or bad JSON. Networking and membership problems live elsewhere.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a control event failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserializing a control event failed.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame is not of the shape the configured payload format expects
    /// (text where binary was expected, invalid base64, empty body).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Well-shaped bytes that do not match the position schema.
    #[error("position decode failed: {0}")]
    PositionDecode(#[from] prost::DecodeError),
}
