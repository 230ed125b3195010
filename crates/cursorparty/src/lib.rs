//! # cursorparty
//!
//! Real-time cursor presence relay over WebSocket.
//!
//! Every connected client is a member of one shared room. Clients stream
//! their cursor position as small protobuf records; the server stamps each
//! record with the sender's connection id and fans it out to everyone else.
//! Membership changes are announced to the whole room as JSON `Join` and
//! `Leave` events carrying the current occupancy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cursorparty::prelude::*;
//!
//! # async fn start() -> Result<(), CursorPartyError> {
//! let server = CursorPartyServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{
    DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_HOST, DEFAULT_OUTBOUND_CAPACITY, DEFAULT_PORT, ServerConfig,
};
pub use error::CursorPartyError;
pub use server::{CursorPartyServer, CursorPartyServerBuilder};

/// Convenience re-exports for embedding the server and writing clients.
pub mod prelude {
    pub use crate::{
        CursorPartyError, CursorPartyServer, CursorPartyServerBuilder, ServerConfig,
    };
    pub use cursorparty_protocol::{
        BroadcastPosition, EVENT_DISCONNECT, EVENT_JOIN, EVENT_LEAVE, EVENT_MOVE,
        InputPosition, PayloadFormat, PositionCodec, ServerEvent,
    };
    pub use cursorparty_room::MembershipRegistry;
    pub use cursorparty_transport::{ConnectionId, Frame};
}
