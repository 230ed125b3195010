//! Wire protocol for cursorparty.
//!
//! This crate defines what travels between browser and relay:
//!
//! - **Position records** ([`InputPosition`], [`BroadcastPosition`]) —
//!   protobuf messages carried by `move` events, via [`PositionCodec`].
//! - **Payload framing** ([`PayloadFormat`]) — whether those bytes ride in
//!   binary frames or base64 text frames.
//! - **Control events** ([`ServerEvent`]) — `join`/`leave` announcements,
//!   JSON-encoded through the [`Codec`] trait.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (frames) and the room session
//! (membership). It knows nothing about who is connected.
//!
//! ```text
//! Transport (Frame) → Protocol (positions, events) → Session (room membership)
//! ```

mod codec;
mod error;
mod format;
mod position;
mod types;

pub use codec::{Codec, PositionCodec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use format::PayloadFormat;
pub use position::{BroadcastPosition, InputPosition};
pub use types::{
    EVENT_DISCONNECT, EVENT_JOIN, EVENT_LEAVE, EVENT_MOVE, ServerEvent,
};
