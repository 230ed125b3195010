//! Error types for the session layer.

use cursorparty_protocol::ProtocolError;
use cursorparty_room::EmitError;
use cursorparty_transport::ConnectionId;

use crate::SessionState;

/// Errors from driving a session through its lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The requested lifecycle event is not valid from the current state,
    /// e.g. a second `join` on the same connection.
    #[error("{id}: cannot handle {event} while {state}")]
    InvalidTransition {
        id: ConnectionId,
        state: SessionState,
        event: &'static str,
    },

    /// The registry already holds this connection id.
    #[error("{0} is already a room member")]
    AlreadyMember(ConnectionId),
}

/// Why one inbound move was dropped.
///
/// Every variant is per-message: the connection stays joined and its next
/// move is processed normally.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    /// The frame is not of the configured payload shape.
    #[error("{0}")]
    MalformedPayload(#[source] ProtocolError),

    /// The payload bytes do not match the position schema.
    #[error("{0}")]
    Decode(#[source] ProtocolError),

    /// The fan-out to peers reported a failure.
    #[error("fan-out failed: {0}")]
    Emit(#[from] EmitError),

    /// The sender is not in the room.
    #[error("{0} has not joined the room")]
    NotJoined(ConnectionId),
}

impl MoveError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Decode(_) => "decode",
            Self::Emit(_) => "emit",
            Self::NotJoined(_) => "not_joined",
        }
    }
}
