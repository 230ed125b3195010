//! The membership registry: who is in the room, and how to reach them.

use std::collections::HashMap;
use std::sync::Arc;

use cursorparty_protocol::ServerEvent;
use cursorparty_transport::ConnectionId;
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::EmitError;

/// An outbound message from the room to one member's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// A `join`/`leave` announcement.
    Event(ServerEvent),
    /// An encoded `BroadcastPosition`, shared by every recipient of one
    /// fan-out.
    Move(Arc<[u8]>),
}

/// Queue feeding one member's writer task.
pub type PeerSender = mpsc::Sender<Outbound>;

/// Receiving end of a member's outbound queue.
pub type PeerReceiver = mpsc::Receiver<Outbound>;

/// Creates a bounded outbound queue for one connection.
///
/// `capacity` is how many messages may be waiting on a slow socket before
/// further fan-outs to that member start failing.
pub fn peer_channel(capacity: usize) -> (PeerSender, PeerReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Who a fan-out is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every member.
    All,
    /// Every member except one, typically the sender of a move.
    AllExcept(ConnectionId),
}

impl Recipient {
    fn includes(self, id: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(excluded) => id != excluded,
        }
    }
}

/// A membership change together with its announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announced {
    /// Occupancy right after the change.
    pub count: usize,
    /// How delivering the announcement went.
    pub delivery: Result<usize, EmitError>,
}

/// Concurrency-safe set of the connections currently joined to the room.
///
/// One registry exists per server. It is shared as `Arc<MembershipRegistry>`
/// by every connection task, which may call any method concurrently.
///
/// Each member is stored with its [`PeerSender`]. A plain [`emit`] copies
/// the relevant senders under the read lock, releases it, and only then
/// delivers.
///
/// [`join`] and [`leave`] are different: the change, the new count and
/// the announcement all happen under one write lock, so announcements are
/// queued in the order the changes happened and the last one a member sees
/// always carries the current occupancy. Delivery is `try_send`, which
/// never waits, so holding the lock across it is fine.
///
/// [`emit`]: Self::emit
/// [`join`]: Self::join
/// [`leave`]: Self::leave
#[derive(Debug, Default)]
pub struct MembershipRegistry {
    members: RwLock<HashMap<ConnectionId, PeerSender>>,
}

impl MembershipRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member.
    ///
    /// Idempotent: if `id` is already present nothing changes (the existing
    /// queue is kept) and `false` is returned.
    pub async fn add(&self, id: ConnectionId, sender: PeerSender) -> bool {
        let mut members = self.members.write().await;
        if members.contains_key(&id) {
            return false;
        }
        members.insert(id, sender);
        true
    }

    /// Removes a member. Removing an absent id is a no-op returning `false`.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        self.members.write().await.remove(&id).is_some()
    }

    /// Adds a member and announces the new occupancy to everyone, the new
    /// member included, before any other change can slip in between.
    ///
    /// `announce` builds the message from the count after the join.
    /// Returns `None`, announcing nothing, if `id` is already present.
    pub async fn join(
        &self,
        id: ConnectionId,
        sender: PeerSender,
        announce: impl FnOnce(usize) -> Outbound,
    ) -> Option<Announced> {
        let mut members = self.members.write().await;
        if members.contains_key(&id) {
            return None;
        }
        members.insert(id, sender);

        let count = members.len();
        let delivery = deliver(members.iter().map(|(id, tx)| (*id, tx)), &announce(count));
        Some(Announced { count, delivery })
    }

    /// Removes a member and announces the new occupancy to whoever
    /// remains, under the same lock as the removal.
    ///
    /// Returns `None`, announcing nothing, if `id` was not a member.
    pub async fn leave(
        &self,
        id: ConnectionId,
        announce: impl FnOnce(usize) -> Outbound,
    ) -> Option<Announced> {
        let mut members = self.members.write().await;
        members.remove(&id)?;

        let count = members.len();
        let delivery = deliver(members.iter().map(|(id, tx)| (*id, tx)), &announce(count));
        Some(Announced { count, delivery })
    }

    /// Current number of members.
    pub async fn count(&self) -> usize {
        self.members.read().await.len()
    }

    /// Returns `true` if `id` is currently a member.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.members.read().await.contains_key(&id)
    }

    /// Snapshot of the current member ids, sorted.
    pub async fn members(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> =
            self.members.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Fans `msg` out to every member selected by `to`.
    ///
    /// Delivery is a non-blocking enqueue per member. A member whose queue
    /// is closed has already left and is skipped. A member whose queue is
    /// full misses this message; the remaining members are still served and
    /// the misses are reported as [`EmitError::Saturated`].
    ///
    /// Returns how many members the message was enqueued for.
    pub async fn emit(
        &self,
        to: Recipient,
        msg: Outbound,
    ) -> Result<usize, EmitError> {
        let targets: Vec<(ConnectionId, PeerSender)> = {
            let members = self.members.read().await;
            members
                .iter()
                .filter(|(id, _)| to.includes(**id))
                .map(|(id, sender)| (*id, sender.clone()))
                .collect()
        };

        deliver(targets.iter().map(|(id, tx)| (*id, tx)), &msg)
    }
}

/// Enqueues `msg` for each target without waiting on any of them.
fn deliver<'a>(
    targets: impl Iterator<Item = (ConnectionId, &'a PeerSender)>,
    msg: &Outbound,
) -> Result<usize, EmitError> {
    let mut attempted = 0;
    let mut delivered = 0;
    let mut dropped = Vec::new();

    for (id, sender) in targets {
        attempted += 1;
        match sender.try_send(msg.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Closed(_)) => {
                tracing::trace!(%id, "member left during fan-out, skipping");
            }
            Err(TrySendError::Full(_)) => {
                tracing::debug!(%id, "outbound queue full, dropping message");
                dropped.push(id);
            }
        }
    }

    if dropped.is_empty() {
        Ok(delivered)
    } else {
        Err(EmitError::Saturated { dropped, attempted })
    }
}
