//! Per-slot liveness bookkeeping.
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::consts::ABRUPT_THRESHOLD;
use crate::consts::SUCCESSOR_CAPACITY;
use crate::dht::AddressBook;
use crate::dht::PeerId;
use crate::dht::Slot;
use crate::dht::SuccessorCallback;
use crate::dht::Successors;
use crate::error::Error;
use crate::error::Result;

/// Liveness state of one successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// The probed successor.
    pub peer: PeerId,
    /// Heartbeat endpoint of the successor.
    pub endpoint: SocketAddr,
    /// Sequence number of the last probe sent.
    pub last_sequence_sent: u64,
    /// Highest sequence number acknowledged.
    pub last_sequence_acked: u64,
    /// When the next probe is due, unset until scheduled.
    pub next_probe_deadline: Option<Instant>,
}

impl ProbeTarget {
    /// Probes sent but not acknowledged.
    pub fn lag(&self) -> u64 {
        self.last_sequence_sent
            .saturating_sub(self.last_sequence_acked)
    }

    /// Too many unanswered probes, the successor is gone.
    pub fn is_dead(&self) -> bool {
        self.lag() >= ABRUPT_THRESHOLD
    }
}

/// One probe the ticker has to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// The probed successor.
    pub peer: PeerId,
    /// Where to send the request.
    pub endpoint: SocketAddr,
    /// Sequence number of the request.
    pub sequence: u64,
}

/// Result of one scan over the probe targets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tick {
    /// Probes to send, outside of any lock.
    pub probes: Vec<Probe>,
    /// A successor that exceeded the abrupt threshold. The scan stops at the first one.
    pub dead: Option<(Slot, PeerId)>,
    /// When to scan next, `None` while nothing is probed.
    pub wake: Option<Instant>,
}

/// Result of [ProbeTable::acknowledge].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The acknowledged sequence moved forward.
    Advanced,
    /// Late, duplicated, or never sent. Nothing changed.
    Stale,
    /// The sender is none of our successors.
    Unknown,
}

/// Probe targets indexed by successor slot.
///
/// Registered as the [SuccessorCallback] of the ring, so targets follow the successor
/// list: a peer moving between slots keeps its counters, a new peer starts fresh, a
/// cleared slot stops being probed.
pub struct ProbeTable {
    addresses: AddressBook,
    interval: Duration,
    targets: Mutex<[Option<ProbeTarget>; SUCCESSOR_CAPACITY]>,
    registered: Notify,
}

impl ProbeTable {
    /// Creates an empty table probing every `interval`.
    pub fn new(addresses: AddressBook, interval: Duration) -> Self {
        Self {
            addresses,
            interval,
            targets: Mutex::new(Default::default()),
            registered: Notify::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<[Option<ProbeTarget>; SUCCESSOR_CAPACITY]>> {
        self.targets.lock().map_err(|_| Error::ProbeLockError)
    }

    fn fresh(&self, peer: PeerId, deadline: Instant) -> Result<ProbeTarget> {
        Ok(ProbeTarget {
            peer,
            endpoint: self.addresses.heartbeat_endpoint(peer)?,
            last_sequence_sent: 0,
            last_sequence_acked: 0,
            next_probe_deadline: Some(deadline),
        })
    }

    /// Start probing `peer` in `slot`, first probe due at `deadline`.
    pub fn track(&self, slot: Slot, peer: PeerId, deadline: Instant) -> Result<()> {
        let target = self.fresh(peer, deadline)?;
        self.lock()?[slot.index()] = Some(target);
        self.registered.notify_one();
        Ok(())
    }

    /// Stop probing `slot`.
    pub fn untrack(&self, slot: Slot) -> Result<Option<ProbeTarget>> {
        Ok(self.lock()?[slot.index()].take())
    }

    /// Snapshot of the target in `slot`.
    pub fn target(&self, slot: Slot) -> Result<Option<ProbeTarget>> {
        Ok(self.lock()?[slot.index()].clone())
    }

    /// Make the targets follow a successor change.
    pub fn retarget(&self, current: Successors) -> Result<()> {
        let deadline = Instant::now() + self.interval;
        let mut targets = self.lock()?;
        let mut next: [Option<ProbeTarget>; SUCCESSOR_CAPACITY] = Default::default();
        let mut added = false;
        for slot in Slot::ALL {
            let Some(peer) = current.get(slot) else {
                continue;
            };
            let kept = targets.iter().flatten().find(|t| t.peer == peer).cloned();
            next[slot.index()] = match kept {
                Some(target) => Some(target),
                None => {
                    added = true;
                    Some(self.fresh(peer, deadline)?)
                }
            };
        }
        *targets = next;
        if added {
            self.registered.notify_one();
        }
        Ok(())
    }

    /// Record an acknowledgement from `peer`. Only forward progress counts.
    pub fn acknowledge(&self, peer: PeerId, seq: u64) -> Result<AckOutcome> {
        let mut targets = self.lock()?;
        let Some(target) = targets.iter_mut().flatten().find(|t| t.peer == peer) else {
            return Ok(AckOutcome::Unknown);
        };
        if seq > target.last_sequence_acked && seq <= target.last_sequence_sent {
            target.last_sequence_acked = seq;
            Ok(AckOutcome::Advanced)
        } else {
            Ok(AckOutcome::Stale)
        }
    }

    /// Scan all targets whose deadline elapsed at `now`.
    pub fn poll(&self, now: Instant) -> Result<Tick> {
        let mut targets = self.lock()?;
        let mut tick = Tick::default();

        for slot in Slot::ALL {
            let Some(target) = targets[slot.index()].as_mut() else {
                continue;
            };
            let Some(deadline) = target.next_probe_deadline else {
                target.next_probe_deadline = Some(now + self.interval);
                continue;
            };
            if deadline > now {
                continue;
            }
            if target.is_dead() {
                tick.dead = Some((slot, target.peer));
                break;
            }
            target.last_sequence_sent += 1;
            tick.probes.push(Probe {
                peer: target.peer,
                endpoint: target.endpoint,
                sequence: target.last_sequence_sent,
            });
            // A late tick must not cause a burst of probes.
            let mut rolled = deadline + self.interval;
            if rolled <= now {
                rolled = now + self.interval;
            }
            target.next_probe_deadline = Some(rolled);
        }

        tick.wake = targets
            .iter()
            .flatten()
            .filter_map(|t| t.next_probe_deadline)
            .min();
        if tick.wake.is_none() && targets.iter().any(Option::is_some) {
            tick.wake = Some(now + self.interval);
        }
        Ok(tick)
    }

    /// Resolves after a target was registered since the last call.
    pub async fn registered(&self) {
        self.registered.notified().await
    }
}

impl SuccessorCallback for ProbeTable {
    fn on_successors_changed(&self, _previous: Successors, current: Successors) {
        if let Err(e) = self.retarget(current) {
            tracing::error!("Failed to retarget heartbeat probes: {}", e);
        }
    }
}
