//! Unified error type for the cursorparty server.

use cursorparty_protocol::ProtocolError;
use cursorparty_session::SessionError;
use cursorparty_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Per-move failures never reach this type: they are logged and dropped
/// inside the connection handler. What does reach it either stops the
/// server (bad config, unusable port) or ends a single connection.
#[derive(Debug, thiserror::Error)]
pub enum CursorPartyError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, framing).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session lifecycle error (invalid transition, duplicate member).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
