//! DHT types about successor slots and the [Ring] protocol.
#![warn(missing_docs)]

use super::id::FileId;
use super::id::PeerId;
use super::routing::RingAction;
use crate::error::Result;

/// One of the two successor slots of a peer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The peer with the next greater id.
    First,
    /// The peer after the first successor.
    Second,
}

impl Slot {
    /// Both slots, in order.
    pub const ALL: [Slot; 2] = [Slot::First, Slot::Second];

    /// Position of the slot in a successor list.
    pub const fn index(&self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
        }
    }

    /// The sibling slot.
    pub const fn other(&self) -> Slot {
        match self {
            Slot::First => Slot::Second,
            Slot::Second => Slot::First,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Slot::First => write!(f, "first"),
            Slot::Second => write!(f, "second"),
        }
    }
}

/// A snapshot of both successor slots.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Successors {
    /// First successor, `None` while unassigned.
    pub first: Option<PeerId>,
    /// Second successor, `None` while unassigned.
    pub second: Option<PeerId>,
}

impl Successors {
    /// Snapshot with both slots assigned.
    pub fn new(first: PeerId, second: PeerId) -> Self {
        Self {
            first: Some(first),
            second: Some(second),
        }
    }

    /// Read one slot.
    pub fn get(&self, slot: Slot) -> Option<PeerId> {
        match slot {
            Slot::First => self.first,
            Slot::Second => self.second,
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: Slot) -> &mut Option<PeerId> {
        match slot {
            Slot::First => &mut self.first,
            Slot::Second => &mut self.second,
        }
    }

    /// Both slots as a pair, when both are assigned.
    pub fn pair(&self) -> Option<(PeerId, PeerId)> {
        self.first.zip(self.second)
    }

    /// True while the peer waits for its join response.
    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }

    /// Either both slots are unset, or both hold distinct peers other than `owner`.
    pub fn is_consistent(&self, owner: PeerId) -> bool {
        match (self.first, self.second) {
            (None, None) => true,
            (Some(first), Some(second)) => first != second && first != owner && second != owner,
            _ => false,
        }
    }
}

/// The membership and placement rules of the ring. Like the Chord trait it
/// mirrors, some methods return a [RingAction], telling the caller which message
/// has to go out after local state was updated.
pub trait Ring {
    /// A peer asks to join. Either the joiner becomes our first successor and is told
    /// its own successors, or the request travels on to our first successor.
    fn join(&self, peer: PeerId) -> Result<RingAction>;

    /// A peer announces its graceful departure together with its successors.
    /// Returns true when our successors changed.
    fn depart(&self, peer: PeerId, first: PeerId, second: PeerId) -> Result<bool>;

    /// Decide whether a file belongs here or travels on to the first successor.
    fn store(&self, file: FileId, requester: PeerId) -> Result<RingAction>;

    /// Decide how to answer a retrieve request, `held` tells whether the file is
    /// stored locally.
    fn retrieve(&self, file: FileId, requester: PeerId, held: bool) -> Result<RingAction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successors_consistency() {
        let owner = PeerId::new(10);
        assert!(Successors::default().is_consistent(owner));
        assert!(Successors::new(PeerId::new(20), PeerId::new(30)).is_consistent(owner));
        assert!(!Successors::new(PeerId::new(20), PeerId::new(20)).is_consistent(owner));
        assert!(!Successors::new(PeerId::new(10), PeerId::new(20)).is_consistent(owner));
        let half = Successors {
            first: Some(PeerId::new(20)),
            second: None,
        };
        assert!(!half.is_consistent(owner));
        assert!(!half.is_empty());
        assert_eq!(half.pair(), None);
    }

    #[test]
    fn test_slot_other() {
        assert_eq!(Slot::First.other(), Slot::Second);
        assert_eq!(Slot::Second.other(), Slot::First);
        assert_eq!(Slot::Second.index(), 1);
    }
}
