//! Per-connection handler: join, move routing, and disconnect.
//!
//! Each accepted socket gets its own Tokio task running this handler,
//! plus a writer task that drains the member's outbound queue. The flow is:
//!   1. Finish the WebSocket upgrade within the handshake timeout
//!   2. Join the room → everyone hears the new count
//!   3. Loop: every inbound data frame is a `move`
//!   4. Transport closes → leave the room → the rest hear the new count

use std::sync::Arc;
use std::time::Duration;

use cursorparty_protocol::{
    Codec, EVENT_DISCONNECT, EVENT_MOVE, PayloadFormat, ProtocolError,
};
use cursorparty_room::{Outbound, PeerReceiver, peer_channel};
use cursorparty_session::RoomSession;
use cursorparty_transport::{
    Connection, Frame, PendingConnection, TransportError, WebSocketConnection,
    WebSocketHandshake,
};

use crate::CursorPartyError;
use crate::server::ServerState;

/// Upper bound on flushing the close frame to a peer that already left.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    pending: WebSocketHandshake,
    state: Arc<ServerState<C>>,
) -> Result<(), CursorPartyError> {
    let conn = Arc::new(upgrade(pending, state.config.handshake_timeout).await?);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, rx) = peer_channel(state.config.outbound_capacity);
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx, Arc::clone(&state)));

    // If the session is dropped without `disconnect` (panic, abort), its
    // own Drop releases the membership.
    let mut session = RoomSession::new(
        conn_id,
        Arc::clone(&state.registry),
        Arc::clone(&state.pipeline),
    );
    session.join(tx).await?;

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let (binary, len) = (frame.is_binary(), frame.len());
        if let Err(e) = session.handle_move(frame).await {
            tracing::warn!(
                %conn_id,
                event = EVENT_MOVE,
                kind = e.kind(),
                binary,
                len,
                error = %e,
                "move dropped"
            );
        }
    }

    let remaining = session.disconnect().await;
    tracing::info!(%conn_id, event = EVENT_DISCONNECT, ?remaining, "client disconnected");

    // The peer is gone; whatever is still queued for it has nowhere to go.
    writer.abort();
    match tokio::time::timeout(CLOSE_TIMEOUT, conn.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::trace!(%conn_id, error = %e, "close after disconnect failed"),
        Err(_) => tracing::trace!(%conn_id, "close after disconnect timed out"),
    }
    Ok(())
}

/// Completes the WebSocket upgrade, giving up after `timeout`.
async fn upgrade(
    pending: WebSocketHandshake,
    timeout: Duration,
) -> Result<WebSocketConnection, CursorPartyError> {
    let addr = pending.peer_addr();
    match tokio::time::timeout(timeout, pending.upgrade()).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => {
            tracing::debug!(%addr, error = %e, "handshake failed");
            Err(e.into())
        }
        Err(_) => {
            tracing::debug!(%addr, ?timeout, "handshake timed out");
            Err(TransportError::HandshakeFailed(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "handshake timed out",
            ))
            .into())
        }
    }
}

/// Drains one member's outbound queue onto its connection.
///
/// Stops when the queue closes (the member left) or a send fails.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: PeerReceiver,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    let format = state.pipeline.format();
    while let Some(msg) = rx.recv().await {
        let event = match &msg {
            Outbound::Event(event) => {
                tracing::trace!(
                    %conn_id,
                    event = event.name(),
                    count = event.count(),
                    "delivering announcement"
                );
                event.name()
            }
            Outbound::Move(_) => EVENT_MOVE,
        };
        let frame = match encode_outbound(&state.codec, format, msg) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    %conn_id,
                    event,
                    error = %e,
                    "failed to encode outbound message"
                );
                continue;
            }
        };
        if let Err(e) = conn.send(frame).await {
            tracing::debug!(%conn_id, event, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Turns a queued message into the frame the client expects: control events
/// as text, moves in the configured payload format.
fn encode_outbound(
    codec: &impl Codec,
    format: PayloadFormat,
    msg: Outbound,
) -> Result<Frame, ProtocolError> {
    match msg {
        Outbound::Event(event) => {
            let bytes = codec.encode(&event)?;
            Ok(match String::from_utf8(bytes) {
                Ok(text) => Frame::Text(text),
                Err(e) => Frame::Binary(e.into_bytes()),
            })
        }
        Outbound::Move(bytes) => Ok(format.wrap(&bytes)),
    }
}
