//! ringpeer-core: a self-organizing peer ring for distributed file placement.
//!
//! Every peer is identified by an integer [PeerId](dht::PeerId) and keeps pointers to
//! its two nearest successors. Liveness of both successors is probed over UDP by the
//! [HeartbeatEngine](heartbeat::HeartbeatEngine); membership changes and content
//! routing travel over the TCP control protocol handled by
//! [ControlProtocol](message::ControlProtocol).
//!
//! Unlike a classic Chord ring, join and departure routing compare peer ids with plain
//! integer ordering. Only file placement hashes ids (`file_id mod 256`).
//!
//! The [Peer](peer::Peer) type wires all parts together:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use ringpeer_core::dht::PeerId;
//! use ringpeer_core::peer::PeerBuilder;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> ringpeer_core::error::Result<()> {
//! let peer = PeerBuilder::new(PeerId::new(10), Duration::from_secs(1)).build()?;
//! peer.init_as_founder(PeerId::new(20), PeerId::new(30))?;
//! peer.run(CancellationToken::new()).await
//! # }
//! ```

pub mod consts;
pub mod dht;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod peer;
pub mod storage;
#[cfg(test)]
mod tests;
