#![warn(missing_docs)]
//! This module provider [PeerBuilder] and it's interface for
//! [Peer]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::consts::DEFAULT_FILE_VARIANTS;
use crate::consts::DEFAULT_IO_TIMEOUT_MS;
use crate::dht::AddressBook;
use crate::dht::PeerId;
use crate::dht::PredecessorTracker;
use crate::dht::RingState;
use crate::error::Result;
use crate::heartbeat::HeartbeatEngine;
use crate::heartbeat::ProbeTable;
use crate::message::ControlClient;
use crate::message::ControlProtocol;
use crate::peer::Peer;
use crate::storage::ContentStore;
use crate::storage::DiskFileTransfer;
use crate::storage::FileTransfer;

/// Creates a PeerBuilder to configure a Peer.
pub struct PeerBuilder {
    id: PeerId,
    interval: Duration,
    addresses: AddressBook,
    io_timeout: Duration,
    storage_dir: PathBuf,
    file_variants: Vec<String>,
    file_transfer: Option<Arc<dyn FileTransfer>>,
}

impl PeerBuilder {
    /// Creates new instance of [PeerBuilder], probing successors every `interval`.
    pub fn new(id: PeerId, interval: Duration) -> Self {
        PeerBuilder {
            id,
            interval,
            addresses: AddressBook::default(),
            io_timeout: Duration::from_millis(DEFAULT_IO_TIMEOUT_MS),
            storage_dir: PathBuf::from("."),
            file_variants: DEFAULT_FILE_VARIANTS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            file_transfer: None,
        }
    }

    /// Sets up the host and base ports every peer listens on.
    pub fn addresses(mut self, addresses: AddressBook) -> Self {
        self.addresses = addresses;
        self
    }

    /// Setup timeout for connecting to and writing to other peers.
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Directory served files are read from and received files written to.
    /// Ignored when a custom [FileTransfer] is set.
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Extensions sent for every retrieved file id.
    pub fn file_variants(mut self, variants: Vec<String>) -> Self {
        self.file_variants = variants;
        self
    }

    /// Bind a custom implementation of file transfer.
    pub fn file_transfer(mut self, transfer: Arc<dyn FileTransfer>) -> Self {
        self.file_transfer = Some(transfer);
        self
    }

    /// Try build for `Peer`.
    pub fn build(self) -> Result<Peer> {
        let ring = Arc::new(RingState::new(self.id, self.interval));
        let probes = Arc::new(ProbeTable::new(self.addresses, self.interval));
        ring.set_callback(probes.clone())?;

        let predecessors = Arc::new(PredecessorTracker::new());
        let contents = Arc::new(ContentStore::new());
        let client = ControlClient::new(self.id, self.addresses, self.io_timeout);

        let transfer = self.file_transfer.unwrap_or_else(|| {
            Arc::new(DiskFileTransfer::new(&self.storage_dir, client.clone())) as Arc<dyn FileTransfer>
        });

        let protocol = ControlProtocol::new(
            ring.clone(),
            predecessors.clone(),
            contents.clone(),
            client.clone(),
            transfer,
            self.file_variants,
        );
        let heartbeat =
            HeartbeatEngine::new(ring.clone(), predecessors.clone(), probes, client.clone());

        Ok(Peer {
            ring,
            predecessors,
            contents,
            client,
            protocol,
            heartbeat,
        })
    }
}
