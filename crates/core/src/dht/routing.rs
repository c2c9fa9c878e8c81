//! Membership and placement rules of [RingState].
use super::id::FileId;
use super::id::PeerId;
use super::successor::RingState;
use super::types::Ring;
use super::types::Slot;
use crate::error::Error;
use crate::error::Result;

/// Result of a [Ring] decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RingAction {
    /// No result, the whole manipulation is done internally.
    None,
    /// The request is served by this peer.
    Accept,
    /// The file is held by no peer on the ring.
    NotFound(FileId),
    /// Trigger a remote action on the given peer.
    RemoteAction(PeerId, RemoteAction),
}

/// Messages that have to reach another peer. The target is the [PeerId] carried by
/// [RingAction::RemoteAction].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteAction {
    /// Forward the join request of a peer.
    Join(PeerId),
    /// Tell a joining peer its successors.
    JoinResponse {
        /// First successor of the joiner.
        first: PeerId,
        /// Second successor of the joiner.
        second: PeerId,
    },
    /// Forward a store request.
    Store {
        /// File to place.
        file: FileId,
        /// Peer that issued the request.
        requester: PeerId,
    },
    /// Forward a retrieve request.
    Retrieve {
        /// File to look up.
        file: FileId,
        /// Peer that wants the file.
        requester: PeerId,
    },
    /// Send every variant of a file to the target.
    Transfer(FileId),
}

impl RingAction {
    /// Check if the action needs a message sent.
    pub fn is_remote(&self) -> bool {
        matches!(self, RingAction::RemoteAction(..))
    }
}

impl Ring for RingState {
    fn join(&self, peer: PeerId) -> Result<RingAction> {
        let mut succ = self.lock()?;
        let (first, second) = succ.pair().ok_or(Error::SuccessorsUnset)?;

        if peer == self.self_id() {
            tracing::warn!("Ignore join request of peer {}: it is this peer", peer);
            return Ok(RingAction::None);
        }
        if peer == first {
            // accepting it would put the same peer in both slots
            tracing::warn!(
                "Ignore join request of peer {}: already our first successor",
                peer
            );
            return Ok(RingAction::None);
        }

        if peer > first {
            tracing::info!("Peer {} Join request forwarded to successor", first);
            if peer < second {
                self.replace_locked(&mut succ, first, peer)?;
                tracing::info!("My first successor remains unchanged at Peer {}", first);
                tracing::info!("My new second successor is Peer {}", peer);
            }
            return Ok(RingAction::RemoteAction(first, RemoteAction::Join(peer)));
        }

        self.replace_locked(&mut succ, peer, first)?;
        tracing::info!("Peer {} join request received", peer);
        tracing::info!("My new first successor is {}", peer);
        tracing::info!("My new second successor is {}", first);
        Ok(RingAction::RemoteAction(
            peer,
            RemoteAction::JoinResponse { first, second },
        ))
    }

    fn depart(&self, peer: PeerId, first: PeerId, second: PeerId) -> Result<bool> {
        let (low, high) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        tracing::info!("Peer {} will depart from the network", peer);

        let mut succ = self.lock()?;
        let (next, after) = match (succ.first, succ.second) {
            (Some(current), _) if current == peer => (low, high),
            (Some(current), Some(current_second)) if current_second == peer => (current, low),
            _ => {
                tracing::info!("I have no relation to peer {} so I'll ignore", peer);
                return Ok(false);
            }
        };

        self.replace_locked(&mut succ, next, after)?;
        tracing::info!("My new first successor is {}", next);
        tracing::info!("My new second successor is {}", after);
        Ok(true)
    }

    fn store(&self, file: FileId, requester: PeerId) -> Result<RingAction> {
        let first = self.successor(Slot::First)?.ok_or(Error::SuccessorsUnset)?;
        let this = self.self_id().as_u32();

        // The tail of the chain (first < self) absorbs every hash beyond the largest id.
        if file.hash() <= this || first.as_u32() < this {
            tracing::info!("Store {} request accepted", file);
            return Ok(RingAction::Accept);
        }
        tracing::info!("Store {} request forwarded to successor", file);
        Ok(RingAction::RemoteAction(
            first,
            RemoteAction::Store { file, requester },
        ))
    }

    fn retrieve(&self, file: FileId, requester: PeerId, held: bool) -> Result<RingAction> {
        if held {
            tracing::info!("Retrieve {} request accepted", file);
            return Ok(RingAction::RemoteAction(
                requester,
                RemoteAction::Transfer(file),
            ));
        }
        if requester == self.self_id() {
            tracing::info!("Couldn't find file {}", file);
            return Ok(RingAction::NotFound(file));
        }
        let first = self.successor(Slot::First)?.ok_or(Error::SuccessorsUnset)?;
        tracing::info!("Retrieve {} request forwarded to successor", file);
        Ok(RingAction::RemoteAction(
            first,
            RemoteAction::Retrieve { file, requester },
        ))
    }
}
