#![warn(missing_docs)]
//! Heartbeat failure detector.
//!
//! Two loops share one UDP socket bound to the heartbeat endpoint of this peer. The
//! ticker probes both successors on their own schedule and starts a
//! [recovery](HeartbeatEngine::recover) once one of them left three probes unanswered.
//! The receiver answers probes of our predecessors and records acknowledgements of our
//! successors.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::consts::MAX_DATAGRAM_LEN;
use crate::dht::PeerId;
use crate::dht::PredecessorTracker;
use crate::dht::RingState;
use crate::error::Result;
use crate::message::ControlClient;
use crate::message::PingMessage;

mod probe;
mod recovery;

pub use probe::AckOutcome;
pub use probe::Probe;
pub use probe::ProbeTable;
pub use probe::ProbeTarget;
pub use probe::Tick;

/// The heartbeat runner.
#[derive(Clone)]
pub struct HeartbeatEngine {
    ring: Arc<RingState>,
    predecessors: Arc<PredecessorTracker>,
    probes: Arc<ProbeTable>,
    client: ControlClient,
}

impl HeartbeatEngine {
    /// Create a new heartbeat runner. `probes` is expected to be the successor callback
    /// of `ring`.
    pub fn new(
        ring: Arc<RingState>,
        predecessors: Arc<PredecessorTracker>,
        probes: Arc<ProbeTable>,
        client: ControlClient,
    ) -> Self {
        Self {
            ring,
            predecessors,
            probes,
            client,
        }
    }

    /// Probe bookkeeping of both successors.
    pub fn probes(&self) -> Arc<ProbeTable> {
        self.probes.clone()
    }

    /// Bind the heartbeat endpoint of this peer.
    pub async fn bind(&self) -> Result<UdpSocket> {
        let endpoint = self
            .client
            .addresses()
            .heartbeat_endpoint(self.ring.self_id())?;
        Ok(UdpSocket::bind(endpoint).await?)
    }

    /// Send one probe with sequence 0 to each known successor right away, without
    /// waiting for the first tick. Returns how many were sent.
    pub async fn verify_successors(&self, socket: &UdpSocket) -> Result<usize> {
        let succ = self.ring.successors()?;
        let mut sent = 0;
        for peer in [succ.first, succ.second].into_iter().flatten() {
            let msg = PingMessage::Request {
                seq: 0,
                sender: self.ring.self_id(),
            };
            if self.send_ping(socket, peer, msg).await {
                sent += 1;
            }
        }
        Ok(sent)
    }

    async fn send_ping(&self, socket: &UdpSocket, peer: PeerId, msg: PingMessage) -> bool {
        let endpoint = match self.client.addresses().heartbeat_endpoint(peer) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!("No heartbeat endpoint for peer {}: {}", peer, e);
                return false;
            }
        };
        match socket.send_to(msg.to_string().as_bytes(), endpoint).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Ping to peer {} at {} failed: {}", peer, endpoint, e);
                false
            }
        }
    }

    /// Probe successors until cancelled. Returns an error only when the ring can not be
    /// repaired, the process is expected to terminate then.
    pub async fn run_ticker(&self, socket: Arc<UdpSocket>, token: CancellationToken) -> Result<()> {
        loop {
            let tick = self.probes.poll(Instant::now())?;
            for probe in tick.probes.iter() {
                let msg = PingMessage::Request {
                    seq: probe.sequence,
                    sender: self.ring.self_id(),
                };
                tracing::debug!("Ping request sent to {}", probe.peer);
                if let Err(e) = socket.send_to(msg.to_string().as_bytes(), probe.endpoint).await {
                    tracing::warn!("Ping to peer {} failed: {}", probe.peer, e);
                }
            }

            if let Some((slot, _)) = tick.dead {
                tokio::select! {
                    _ = token.cancelled() => return Ok(()),
                    res = self.recover(slot) => res?,
                }
                continue;
            }

            tokio::select! {
                _ = token.cancelled() => return Ok(()),
                _ = sleep_until(tick.wake) => {}
                _ = self.probes.registered() => {}
            }
        }
    }

    /// Answer probes and record acknowledgements until cancelled. Malformed datagrams
    /// are logged and dropped.
    pub async fn run_receiver(&self, socket: Arc<UdpSocket>, token: CancellationToken) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            let received = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                received = socket.recv_from(&mut buf) => received,
            };
            let (len, from) = match received {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("Failed to receive heartbeat: {}", e);
                    continue;
                }
            };
            let msg = match std::str::from_utf8(&buf[..len])
                .map_err(|_| "not UTF-8".to_string())
                .and_then(|text| {
                    text.trim_end_matches('\0')
                        .parse::<PingMessage>()
                        .map_err(|e| e.to_string())
                }) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("Ignoring non ping message from {}: {}", from, e);
                    continue;
                }
            };

            match msg {
                PingMessage::Acknowledge { seq, sender } => {
                    match self.probes.acknowledge(sender, seq)? {
                        AckOutcome::Unknown => tracing::debug!(
                            "Ping response received from Peer {} but wasn't expecting it",
                            sender
                        ),
                        _ => tracing::debug!("Ping response received from Peer {}", sender),
                    }
                }
                PingMessage::Request { seq, sender } => {
                    tracing::debug!("Ping request received from Peer {}", sender);
                    self.predecessors.record(sender)?;
                    let ack = PingMessage::Acknowledge {
                        seq,
                        sender: self.ring.self_id(),
                    };
                    if self.send_ping(&socket, sender, ack).await {
                        tracing::debug!("Ping response sent to {}", sender);
                    }
                }
            }
        }
    }
}

async fn sleep_until(wake: Option<Instant>) {
    match wake {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
