//! Mapping from peer ids to network endpoints.
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;

use crate::consts::DEFAULT_BASE_PORT;
use crate::dht::PeerId;
use crate::error::Error;
use crate::error::Result;

/// Every peer listens on `base + peer_id`, heartbeats over UDP and control messages
/// over TCP. The book holds no state beyond the host and the two base ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBook {
    host: IpAddr,
    heartbeat_base: u16,
    control_base: u16,
}

impl Default for AddressBook {
    fn default() -> Self {
        Self::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            DEFAULT_BASE_PORT,
            DEFAULT_BASE_PORT,
        )
    }
}

impl AddressBook {
    /// Creates a book for peers on `host`.
    pub fn new(host: IpAddr, heartbeat_base: u16, control_base: u16) -> Self {
        Self {
            host,
            heartbeat_base,
            control_base,
        }
    }

    /// Host every peer is reachable on.
    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// UDP endpoint answering heartbeats of `peer`.
    pub fn heartbeat_endpoint(&self, peer: PeerId) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.host, offset(self.heartbeat_base, peer)?))
    }

    /// TCP endpoint accepting control messages of `peer`.
    pub fn control_endpoint(&self, peer: PeerId) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.host, offset(self.control_base, peer)?))
    }
}

fn offset(base: u16, peer: PeerId) -> Result<u16> {
    u16::try_from(peer.as_u32())
        .ok()
        .and_then(|p| base.checked_add(p))
        .ok_or(Error::PeerOutOfRange(peer))
}
