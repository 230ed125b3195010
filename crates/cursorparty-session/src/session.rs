//! One connection's participation in the room.
//!
//! ```text
//!   Connected ──(join)──→ Joined ──(disconnect)──→ Disconnected
//!                           │
//!                           └── move events accepted only here
//! ```
//!
//! `disconnect` consumes the session, so it can run at most once per
//! connection. A session dropped while still `Joined` (its task panicked or
//! was aborted) leaves the room from a spawned cleanup task.

use std::fmt;
use std::sync::Arc;

use cursorparty_protocol::{EVENT_JOIN, EVENT_LEAVE, ServerEvent};
use cursorparty_room::{MembershipRegistry, Outbound, PeerSender};
use cursorparty_transport::{ConnectionId, Frame};

use crate::{BroadcastPipeline, MoveError, SessionError};

/// Lifecycle state of a [`RoomSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport connection is up; not yet a room member.
    Connected,
    /// In the room: counted, announced, receiving moves.
    Joined,
    /// Left the room. Terminal.
    Disconnected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "Connected"),
            Self::Joined => write!(f, "Joined"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Drives one connection through join, moves, and disconnect.
pub struct RoomSession {
    id: ConnectionId,
    state: SessionState,
    registry: Arc<MembershipRegistry>,
    pipeline: Arc<BroadcastPipeline>,
}

impl RoomSession {
    /// Creates a session in the `Connected` state.
    pub fn new(
        id: ConnectionId,
        registry: Arc<MembershipRegistry>,
        pipeline: Arc<BroadcastPipeline>,
    ) -> Self {
        Self {
            id,
            state: SessionState::Connected,
            registry,
            pipeline,
        }
    }

    /// The connection this session belongs to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Joins the room: registers `sender` as this connection's outbound
    /// queue and announces the new occupancy to every member, the joiner
    /// included.
    ///
    /// Returns the occupancy right after the join.
    ///
    /// # Errors
    /// - [`SessionError::InvalidTransition`] if not in `Connected`
    /// - [`SessionError::AlreadyMember`] if the registry already holds this id
    pub async fn join(&mut self, sender: PeerSender) -> Result<usize, SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::InvalidTransition {
                id: self.id,
                state: self.state,
                event: EVENT_JOIN,
            });
        }
        let joined = self
            .registry
            .join(self.id, sender, |count| {
                Outbound::Event(ServerEvent::Join { count })
            })
            .await
            .ok_or(SessionError::AlreadyMember(self.id))?;
        self.state = SessionState::Joined;

        tracing::info!(conn_id = %self.id, count = joined.count, "joined room");
        if let Err(e) = joined.delivery {
            tracing::warn!(
                conn_id = %self.id,
                event = EVENT_JOIN,
                error = %e,
                "join announcement incomplete"
            );
        }
        Ok(joined.count)
    }

    /// Handles one inbound `move` frame.
    ///
    /// # Errors
    /// [`MoveError::NotJoined`] outside the `Joined` state, otherwise
    /// whatever the pipeline reports. The session is unaffected either way.
    pub async fn handle_move(&self, frame: Frame) -> Result<usize, MoveError> {
        if self.state != SessionState::Joined {
            return Err(MoveError::NotJoined(self.id));
        }
        self.pipeline.handle_move(&self.registry, self.id, frame).await
    }

    /// Leaves the room and announces the departure to the remaining
    /// members.
    ///
    /// Returns the occupancy after leaving, or `None` if the session never
    /// joined.
    pub async fn disconnect(mut self) -> Option<usize> {
        let was_joined = self.state == SessionState::Joined;
        self.state = SessionState::Disconnected;
        if !was_joined {
            return None;
        }
        leave_room(&self.registry, self.id).await
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        if self.state != SessionState::Joined {
            return;
        }
        self.state = SessionState::Disconnected;

        let id = self.id;
        let registry = Arc::clone(&self.registry);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    leave_room(&registry, id).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    conn_id = %id,
                    "session dropped outside a runtime, membership not released"
                );
            }
        }
    }
}

/// Removes `id` and announces `leave` to whoever remains. Announces nothing
/// if `id` was not a member.
async fn leave_room(registry: &MembershipRegistry, id: ConnectionId) -> Option<usize> {
    let left = registry
        .leave(id, |count| {
            Outbound::Event(ServerEvent::Leave {
                count,
                id: id.to_string(),
            })
        })
        .await?;
    tracing::info!(conn_id = %id, count = left.count, "left room");

    if let Err(e) = left.delivery {
        tracing::warn!(
            conn_id = %id,
            event = EVENT_LEAVE,
            error = %e,
            "leave announcement incomplete"
        );
    }
    Some(left.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cursorparty_protocol::PayloadFormat;
    use cursorparty_room::{PeerReceiver, peer_channel};

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn session(id: u64, registry: &Arc<MembershipRegistry>) -> RoomSession {
        RoomSession::new(
            cid(id),
            Arc::clone(registry),
            Arc::new(BroadcastPipeline::new(PayloadFormat::Binary)),
        )
    }

    async fn joined(id: u64, registry: &Arc<MembershipRegistry>) -> (RoomSession, PeerReceiver) {
        let mut s = session(id, registry);
        let (tx, rx) = peer_channel(16);
        s.join(tx).await.expect("join should succeed");
        (s, rx)
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[tokio::test]
    async fn test_join_transitions_to_joined_and_announces_count() {
        let registry = Arc::new(MembershipRegistry::new());
        let mut s = session(1, &registry);
        assert_eq!(s.state(), SessionState::Connected);

        let (tx, mut rx) = peer_channel(4);
        let count = s.join(tx).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(s.state(), SessionState::Joined);
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Event(ServerEvent::Join { count: 1 }),
            "the joiner hears its own join"
        );
    }

    #[tokio::test]
    async fn test_join_twice_returns_invalid_transition() {
        let registry = Arc::new(MembershipRegistry::new());
        let (mut s, _rx) = joined(1, &registry).await;

        let (tx, _rx2) = peer_channel(4);
        let result = s.join(tx).await;

        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition { state: SessionState::Joined, event: "join", .. })
        ));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_join_duplicate_id_returns_already_member() {
        let registry = Arc::new(MembershipRegistry::new());
        let (_first, _rx) = joined(1, &registry).await;

        let mut dup = session(1, &registry);
        let (tx, _rx2) = peer_channel(4);
        let result = dup.join(tx).await;

        assert!(matches!(result, Err(SessionError::AlreadyMember(id)) if id == cid(1)));
        assert_eq!(dup.state(), SessionState::Connected);
        // Dropping the rejected duplicate must not evict the real member.
        drop(dup);
        tokio::task::yield_now().await;
        assert!(registry.contains(cid(1)).await);
    }

    // =====================================================================
    // handle_move()
    // =====================================================================

    #[tokio::test]
    async fn test_handle_move_before_join_returns_not_joined() {
        let registry = Arc::new(MembershipRegistry::new());
        let s = session(1, &registry);

        let result = s.handle_move(Frame::Binary(vec![0x09])).await;

        assert!(matches!(result, Err(MoveError::NotJoined(id)) if id == cid(1)));
    }

    // =====================================================================
    // disconnect()
    // =====================================================================

    #[tokio::test]
    async fn test_disconnect_removes_member_and_announces_leave() {
        let registry = Arc::new(MembershipRegistry::new());
        let (a, _a_rx) = joined(1, &registry).await;
        let (_b, mut b_rx) = joined(2, &registry).await;
        while b_rx.try_recv().is_ok() {}

        let remaining = a.disconnect().await;

        assert_eq!(remaining, Some(1));
        assert!(!registry.contains(cid(1)).await);
        assert_eq!(
            b_rx.try_recv().unwrap(),
            Outbound::Event(ServerEvent::Leave {
                count: 1,
                id: "conn-1".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_disconnect_without_join_is_noop() {
        let registry = Arc::new(MembershipRegistry::new());
        let (_b, mut b_rx) = joined(2, &registry).await;
        while b_rx.try_recv().is_ok() {}

        let remaining = session(1, &registry).disconnect().await;

        assert_eq!(remaining, None);
        assert_eq!(registry.count().await, 1);
        assert!(b_rx.try_recv().is_err(), "no leave for a non-member");
    }

    #[tokio::test]
    async fn test_drop_while_joined_releases_membership() {
        let registry = Arc::new(MembershipRegistry::new());
        let (a, _a_rx) = joined(1, &registry).await;
        let (_b, mut b_rx) = joined(2, &registry).await;
        while b_rx.try_recv().is_ok() {}

        drop(a);

        let leave = tokio::time::timeout(std::time::Duration::from_secs(1), b_rx.recv())
            .await
            .expect("cleanup should run")
            .expect("queue open");
        assert_eq!(
            leave,
            Outbound::Event(ServerEvent::Leave {
                count: 1,
                id: "conn-1".into(),
            })
        );
        assert!(!registry.contains(cid(1)).await);
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Connected.to_string(), "Connected");
        assert_eq!(SessionState::Joined.to_string(), "Joined");
        assert_eq!(SessionState::Disconnected.to_string(), "Disconnected");
    }
}
