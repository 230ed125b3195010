//! Control events and event names.

use serde::{Deserialize, Serialize};

/// Event name for a connection entering the room.
pub const EVENT_JOIN: &str = "join";
/// Event name for a connection leaving the room.
pub const EVENT_LEAVE: &str = "leave";
/// Event name for a cursor position update.
pub const EVENT_MOVE: &str = "move";
/// Event name for the transport reporting a closed connection.
pub const EVENT_DISCONNECT: &str = "disconnect";

/// Membership announcements sent by the server to the whole room.
///
/// Internally tagged, so on the wire these read as
/// `{"type":"Join","count":2}` and
/// `{"type":"Leave","count":1,"id":"conn-3"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Someone joined. `count` is the occupancy right after the join.
    Join { count: usize },

    /// Someone left. `count` is the occupancy right after the departure,
    /// `id` the departing connection.
    Leave { count: usize, id: String },
}

impl ServerEvent {
    /// The event name this announcement is delivered under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => EVENT_JOIN,
            Self::Leave { .. } => EVENT_LEAVE,
        }
    }

    /// Occupancy carried by the event.
    pub fn count(&self) -> usize {
        match self {
            Self::Join { count } | Self::Leave { count, .. } => *count,
        }
    }
}
