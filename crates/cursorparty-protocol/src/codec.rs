//! Codecs for the two kinds of traffic on the wire.
//!
//! Control events (`join`, `leave`) go through the [`Codec`] trait, with
//! [`JsonCodec`] as the implementation: they are rare and a browser client
//! can read them without a schema.
//!
//! Position records go through [`PositionCodec`], a fixed-schema protobuf
//! codec. Moves are the hot path, so they stay compact and binary.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode serde types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec value is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use cursorparty_protocol::{Codec, JsonCodec, ServerEvent};
///
/// let codec = JsonCodec;
/// let event = ServerEvent::Join { count: 3 };
///
/// let bytes = codec.encode(&event).unwrap();
/// assert_eq!(bytes, br#"{"type":"Join","count":3}"#);
///
/// let decoded: ServerEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

/// Protobuf codec for [`InputPosition`](crate::InputPosition) and
/// [`BroadcastPosition`](crate::BroadcastPosition).
///
/// Encoding into a `Vec<u8>` cannot fail, so only `decode` returns a
/// `Result`. Unknown fields are skipped on decode, which is what lets an
/// older client that still sends its own `id` keep working: the field is
/// simply never read.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionCodec;

impl PositionCodec {
    /// Encodes a position record.
    pub fn encode<M: prost::Message>(&self, record: &M) -> Vec<u8> {
        record.encode_to_vec()
    }

    /// Decodes a position record.
    ///
    /// # Errors
    /// Returns [`ProtocolError::PositionDecode`] when the bytes are not a
    /// valid encoding of `M` (truncated field, wrong wire type, bad UTF-8
    /// in a string field).
    pub fn decode<M: prost::Message + Default>(
        &self,
        data: &[u8],
    ) -> Result<M, ProtocolError> {
        Ok(M::decode(data)?)
    }
}
