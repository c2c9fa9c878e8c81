//! Successor slots of a peer on the ring.
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::RwLock;
use std::time::Duration;

use tokio::sync::Notify;

use crate::dht::PeerId;
use crate::dht::Slot;
use crate::dht::Successors;
use crate::error::Error;
use crate::error::Result;

/// Observer of successor changes. The heartbeat probe table registers itself here,
/// so every change of a slot re-targets the probe of that slot.
pub trait SuccessorCallback: Send + Sync {
    /// Called under the ring lock after a slot changed. Implementations must not call
    /// back into [RingState].
    fn on_successors_changed(&self, _previous: Successors, _current: Successors) {}
}

/// Shared callback object.
pub type SharedSuccessorCallback = Arc<dyn SuccessorCallback>;

/// Result of [RingState::set].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    /// The slot was empty and now holds the new peer.
    Set,
    /// The slot was already populated, nothing changed.
    Conflict(PeerId),
}

/// The authoritative record of this peer's position in the ring.
///
/// Both slots live behind one mutex, so readers never observe a half updated pair
/// written by [RingState::replace_both]. Readers that must not act on an unassigned
/// ring use [RingState::wait_successor], which suspends until a slot is published.
pub struct RingState {
    /// Id of current peer.
    self_id: PeerId,
    /// Heartbeat interval.
    interval: Duration,
    successors: Mutex<Successors>,
    published: Notify,
    callback: RwLock<Option<SharedSuccessorCallback>>,
}

impl RingState {
    /// Creates an unassigned ring state, as a joining peer starts.
    pub fn new(self_id: PeerId, interval: Duration) -> Self {
        Self {
            self_id,
            interval,
            successors: Mutex::new(Successors::default()),
            published: Notify::new(),
            callback: RwLock::new(None),
        }
    }

    /// Id of current peer.
    pub fn self_id(&self) -> PeerId {
        self.self_id
    }

    /// Heartbeat interval of current peer.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Bind the observer of successor changes.
    pub fn set_callback(&self, callback: SharedSuccessorCallback) -> Result<()> {
        let mut inner = self
            .callback
            .write()
            .map_err(|_| Error::CallbackLockError)?;
        *inner = Some(callback);
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<Successors>> {
        self.successors.lock().map_err(|_| Error::RingLockError)
    }

    /// Snapshot of both slots.
    pub fn successors(&self) -> Result<Successors> {
        Ok(*self.lock()?)
    }

    /// Non-blocking read of one slot.
    pub fn successor(&self, slot: Slot) -> Result<Option<PeerId>> {
        Ok(self.lock()?.get(slot))
    }

    /// Blocking read of one slot, suspends until the slot is assigned.
    pub async fn wait_successor(&self, slot: Slot) -> Result<PeerId> {
        loop {
            let notified = self.published.notified();
            tokio::pin!(notified);
            // Register before checking, a publish between check and await is not lost.
            notified.as_mut().enable();
            if let Some(peer) = self.successor(slot)? {
                return Ok(peer);
            }
            notified.await;
        }
    }

    /// Wait until both slots are assigned and return them.
    pub async fn wait_successors(&self) -> Result<(PeerId, PeerId)> {
        loop {
            let notified = self.published.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(pair) = self.successors()?.pair() {
                return Ok(pair);
            }
            notified.await;
        }
    }

    /// Clear one slot, returning the peer it held.
    pub fn clear(&self, slot: Slot) -> Result<Option<PeerId>> {
        let mut succ = self.lock()?;
        let previous = *succ;
        let cleared = succ.slot_mut(slot).take();
        if cleared.is_some() {
            self.changed(previous, *succ)?;
        }
        Ok(cleared)
    }

    /// Compare-and-set of one slot. A populated slot is never overwritten, callers
    /// clear it first. Two racing repairs therefore cannot both fill the same slot.
    pub fn set(&self, slot: Slot, peer: PeerId) -> Result<SetOutcome> {
        let mut succ = self.lock()?;
        if let Some(existing) = succ.get(slot) {
            return Ok(SetOutcome::Conflict(existing));
        }
        if peer == self.self_id || succ.get(slot.other()) == Some(peer) {
            return Err(Error::InvalidSuccessors {
                peer: self.self_id,
                first: succ.first.unwrap_or(peer),
                second: succ.second.unwrap_or(peer),
            });
        }
        let previous = *succ;
        *succ.slot_mut(slot) = Some(peer);
        self.changed(previous, *succ)?;
        self.published.notify_waiters();
        Ok(SetOutcome::Set)
    }

    /// Atomically replace both slots.
    pub fn replace_both(&self, first: PeerId, second: PeerId) -> Result<()> {
        let mut succ = self.lock()?;
        self.replace_locked(&mut succ, first, second)
    }

    pub(crate) fn replace_locked(
        &self,
        succ: &mut MutexGuard<Successors>,
        first: PeerId,
        second: PeerId,
    ) -> Result<()> {
        let next = Successors::new(first, second);
        if !next.is_consistent(self.self_id) {
            return Err(Error::InvalidSuccessors {
                peer: self.self_id,
                first,
                second,
            });
        }
        let previous = **succ;
        **succ = next;
        if previous != next {
            self.changed(previous, next)?;
        }
        self.published.notify_waiters();
        Ok(())
    }

    fn changed(&self, previous: Successors, current: Successors) -> Result<()> {
        tracing::debug!(
            "successors of {} changed from {:?} to {:?}",
            self.self_id,
            previous,
            current
        );
        let callback = self
            .callback
            .read()
            .map_err(|_| Error::CallbackLockError)?;
        if let Some(cb) = callback.as_ref() {
            cb.on_successors_changed(previous, current);
        }
        Ok(())
    }
}
