//! Error types for the room layer.

use cursorparty_transport::ConnectionId;

/// A fan-out that could not reach every intended recipient.
///
/// Members that left mid fan-out are not failures; they are skipped
/// silently. What remains is a peer whose outbound queue is full, which is
/// the transport failing to keep up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    /// Outbound queues were full for the listed members. The message was
    /// still handed to every other recipient.
    #[error("outbound queue full for {} of {attempted} recipients", .dropped.len())]
    Saturated {
        dropped: Vec<ConnectionId>,
        attempted: usize,
    },
}
