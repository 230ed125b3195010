//! The move broadcast pipeline.
//!
//! One inbound frame goes through five steps:
//!
//! ```text
//! Frame ──unwrap──→ bytes ──decode──→ InputPosition
//!                                          │ stamp(sender)
//!                                          ▼
//! peers ←──emit(AllExcept sender)── bytes ←──encode── BroadcastPosition
//! ```
//!
//! Identity is always stamped here from the connection the frame arrived
//! on. Nothing inside the payload can choose the `id` peers see.

use std::sync::Arc;

use cursorparty_protocol::{BroadcastPosition, InputPosition, PayloadFormat, PositionCodec};
use cursorparty_room::{MembershipRegistry, Outbound, Recipient};
use cursorparty_transport::{ConnectionId, Frame};

use crate::MoveError;

/// Stateless per-message logic for `move` events. Shared by all sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastPipeline {
    format: PayloadFormat,
    codec: PositionCodec,
}

impl BroadcastPipeline {
    /// Creates a pipeline that accepts payloads framed as `format`.
    pub fn new(format: PayloadFormat) -> Self {
        Self {
            format,
            codec: PositionCodec,
        }
    }

    /// The payload format inbound frames must use.
    pub fn format(&self) -> PayloadFormat {
        self.format
    }

    /// Checks the frame shape and decodes the position inside it.
    ///
    /// # Errors
    /// [`MoveError::MalformedPayload`] for a wrongly shaped frame,
    /// [`MoveError::Decode`] for bytes that are not an `InputPosition`.
    pub fn decode(&self, frame: Frame) -> Result<InputPosition, MoveError> {
        let bytes = self
            .format
            .unwrap_frame(frame)
            .map_err(MoveError::MalformedPayload)?;
        self.codec.decode(&bytes).map_err(MoveError::Decode)
    }

    /// Builds the record peers receive: the input's coordinates and room,
    /// attributed to `sender`.
    pub fn stamp(sender: ConnectionId, input: InputPosition) -> BroadcastPosition {
        BroadcastPosition {
            id: sender.to_string(),
            x: input.x,
            y: input.y,
            room: input.room,
        }
    }

    /// Encodes a broadcast record for fan-out.
    pub fn encode(&self, position: &BroadcastPosition) -> Vec<u8> {
        self.codec.encode(position)
    }

    /// Runs one inbound move through the whole pipeline and fans the result
    /// out to every member of `registry` except `sender`.
    ///
    /// Returns the number of peers the move was enqueued for.
    ///
    /// # Errors
    /// See [`MoveError`]. No error is retried.
    pub async fn handle_move(
        &self,
        registry: &MembershipRegistry,
        sender: ConnectionId,
        frame: Frame,
    ) -> Result<usize, MoveError> {
        let input = self.decode(frame)?;
        let position = Self::stamp(sender, input);
        let bytes: Arc<[u8]> = self.encode(&position).into();

        let delivered = registry
            .emit(Recipient::AllExcept(sender), Outbound::Move(bytes))
            .await?;

        tracing::trace!(
            %sender,
            x = position.x,
            y = position.y,
            room = %position.room,
            delivered,
            "move fanned out"
        );
        Ok(delivered)
    }
}
