#![warn(missing_docs)]
//! A peer of the ring: ring state, heartbeat engine and control protocol wired
//! together.

mod builder;

use std::sync::Arc;

pub use builder::PeerBuilder;
use tokio::net::TcpListener;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::dht::FileId;
use crate::dht::PeerId;
use crate::dht::PredecessorTracker;
use crate::dht::RingState;
use crate::dht::Slot;
use crate::dht::Successors;
use crate::error::Result;
use crate::heartbeat::HeartbeatEngine;
use crate::message::ControlClient;
use crate::message::ControlProtocol;
use crate::storage::ContentStore;

/// Both endpoints of a peer, bound before anything is sent so that replies always find
/// a listener.
pub struct Sockets {
    /// Control endpoint.
    pub listener: TcpListener,
    /// Heartbeat endpoint, shared by the ticker and the receiver.
    pub socket: Arc<UdpSocket>,
}

/// How a peer enters the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Start with known successors.
    Founder {
        /// First successor.
        first: PeerId,
        /// Second successor.
        second: PeerId,
    },
    /// Ask a peer already on the ring to place us.
    Joiner {
        /// Any peer on the ring.
        known: PeerId,
    },
}

/// One member of the ring.
pub struct Peer {
    ring: Arc<RingState>,
    predecessors: Arc<PredecessorTracker>,
    contents: Arc<ContentStore>,
    client: ControlClient,
    protocol: ControlProtocol,
    heartbeat: HeartbeatEngine,
}

impl Peer {
    /// Get id of self.
    pub fn current_peer_id(&self) -> PeerId {
        self.ring.self_id()
    }

    /// Get ring state of self.
    pub fn ring(&self) -> Arc<RingState> {
        self.ring.clone()
    }

    /// Snapshot of both successors.
    pub fn successors(&self) -> Result<Successors> {
        self.ring.successors()
    }

    /// Tracked predecessors, most recent first.
    pub fn predecessors(&self) -> Result<Vec<PeerId>> {
        self.predecessors.list()
    }

    /// Files stored on this peer.
    pub fn contents(&self) -> Vec<FileId> {
        self.contents.list()
    }

    /// Control protocol of this peer.
    pub fn protocol(&self) -> &ControlProtocol {
        &self.protocol
    }

    /// Heartbeat engine of this peer.
    pub fn heartbeat(&self) -> &HeartbeatEngine {
        &self.heartbeat
    }

    /// Start a new ring with known successors.
    pub fn init_as_founder(&self, first: PeerId, second: PeerId) -> Result<()> {
        tracing::info!("Peer {} init", self.current_peer_id());
        self.ring.replace_both(first, second)
    }

    /// Ask `known` to place us on the ring. The successors arrive later with a join
    /// response, see [Peer::wait_joined].
    pub async fn init_as_joiner(&self, known: PeerId) -> Result<()> {
        tracing::info!("Peer {} join", self.current_peer_id());
        self.client
            .send_join_request(known, self.current_peer_id())
            .await
    }

    /// Wait until both successors are assigned.
    pub async fn wait_joined(&self) -> Result<(PeerId, PeerId)> {
        self.ring.wait_successors().await
    }

    /// Bind the control and heartbeat endpoints.
    pub async fn bind(&self) -> Result<Sockets> {
        let listener = self.protocol.bind().await?;
        let socket = Arc::new(self.heartbeat.bind().await?);
        Ok(Sockets { listener, socket })
    }

    /// Run listener, heartbeat receiver and ticker until cancelled. Returns the first
    /// error of any of them, which is fatal for the peer.
    pub async fn serve(&self, sockets: Sockets, token: CancellationToken) -> Result<()> {
        let Sockets { listener, socket } = sockets;
        let verified = self.heartbeat.verify_successors(&socket).await?;
        tracing::debug!("sent {} startup probes", verified);

        let res = tokio::select! {
            res = self.protocol.serve(listener, token.clone()) => res,
            res = self.heartbeat.run_receiver(socket.clone(), token.clone()) => res,
            res = self.heartbeat.run_ticker(socket, token.clone()) => res,
        };
        // stop connection handlers still running
        token.cancel();
        res
    }

    /// Bind both endpoints, then [serve](Peer::serve).
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        let sockets = self.bind().await?;
        self.serve(sockets, token).await
    }

    /// Bind, enter the ring and serve in a spawned task until `token` is cancelled.
    ///
    /// Founders are seeded before serving starts, so the startup probes reach both
    /// successors. Joiners announce themselves once both endpoints listen.
    pub async fn start(
        self: &Arc<Self>,
        entry: Entry,
        token: CancellationToken,
    ) -> Result<JoinHandle<Result<()>>> {
        let sockets = self.bind().await?;
        if let Entry::Founder { first, second } = entry {
            self.init_as_founder(first, second)?;
        }
        let handle = tokio::spawn({
            let peer = self.clone();
            async move { peer.serve(sockets, token).await }.in_current_span()
        });
        if let Entry::Joiner { known } = entry {
            if let Err(e) = self.init_as_joiner(known).await {
                handle.abort();
                return Err(e);
            }
        }
        Ok(handle)
    }

    /// Store `file` on the ring. The request enters at this peer.
    pub async fn store(&self, file: FileId) -> Result<()> {
        let me = self.current_peer_id();
        self.client.send_store_request(file, me, me).await
    }

    /// Request `file` from the ring, starting at our first successor.
    pub async fn request(&self, file: FileId) -> Result<()> {
        let first = self.ring.wait_successor(Slot::First).await?;
        self.client
            .send_retrieve_request(file, self.current_peer_id(), first)
            .await
    }

    /// Tell tracked predecessors that we leave, then stop all loops.
    pub async fn shutdown(&self, token: CancellationToken) -> Result<()> {
        let notified = self
            .client
            .send_depart_notice(&self.ring, &self.predecessors)
            .await;
        token.cancel();
        tracing::info!("Peer {} closing down", self.current_peer_id());
        let notified = notified?;
        tracing::debug!("depart notice sent to {} predecessors", notified);
        Ok(())
    }
}
