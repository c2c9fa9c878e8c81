//! Recent pingers of this peer.
use std::sync::Mutex;

use crate::consts::PREDECESSOR_CAPACITY;
use crate::dht::PeerId;
use crate::error::Error;
use crate::error::Result;

/// Shift register of the peers that recently probed us, most recent first.
/// Those are our likely predecessors, told about a graceful departure.
#[derive(Debug, Default)]
pub struct PredecessorTracker {
    recent: Mutex<[Option<PeerId>; PREDECESSOR_CAPACITY]>,
}

impl PredecessorTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound probe of `peer`. A tracked peer moves to the front, so the
    /// register never holds one peer twice.
    pub fn record(&self, peer: PeerId) -> Result<()> {
        let mut recent = self
            .recent
            .lock()
            .map_err(|_| Error::PredecessorLockError)?;
        let end = recent
            .iter()
            .position(|p| *p == Some(peer))
            .unwrap_or(PREDECESSOR_CAPACITY - 1);
        recent[..=end].rotate_right(1);
        recent[0] = Some(peer);
        Ok(())
    }

    /// Tracked predecessors, most recent first.
    pub fn list(&self) -> Result<Vec<PeerId>> {
        let recent = self
            .recent
            .lock()
            .map_err(|_| Error::PredecessorLockError)?;
        Ok(recent.iter().flatten().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_shifts_and_drops_oldest() -> Result<()> {
        let tracker = PredecessorTracker::new();
        assert!(tracker.list()?.is_empty());

        tracker.record(PeerId::new(5))?;
        assert_eq!(tracker.list()?, vec![PeerId::new(5)]);

        tracker.record(PeerId::new(8))?;
        assert_eq!(tracker.list()?, vec![PeerId::new(8), PeerId::new(5)]);

        tracker.record(PeerId::new(9))?;
        assert_eq!(tracker.list()?, vec![PeerId::new(9), PeerId::new(8)]);
        Ok(())
    }

    #[test]
    fn test_repeated_pinger_is_not_duplicated() -> Result<()> {
        let tracker = PredecessorTracker::new();
        tracker.record(PeerId::new(5))?;
        tracker.record(PeerId::new(5))?;
        assert_eq!(tracker.list()?, vec![PeerId::new(5)]);

        tracker.record(PeerId::new(8))?;
        tracker.record(PeerId::new(5))?;
        assert_eq!(tracker.list()?, vec![PeerId::new(5), PeerId::new(8)]);
        Ok(())
    }
}
