//! Outbound side of the control protocol.
use std::future::Future;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpStream;

use super::frame::read_header;
use super::types::ControlMessage;
use super::types::JoinRequest;
use super::types::JoinResponse;
use super::types::PeerDepart;
use super::types::RecoveryQuery;
use super::types::RetrieveRequest;
use super::types::StoreRequest;
use crate::dht::AddressBook;
use crate::dht::FileId;
use crate::dht::PeerId;
use crate::dht::PredecessorTracker;
use crate::dht::RingState;
use crate::error::Error;
use crate::error::Result;

/// Sends control messages, one fresh connection per message. Cheap to clone, shared by
/// the listener, the heartbeat engine and the console.
#[derive(Clone, Debug)]
pub struct ControlClient {
    self_id: PeerId,
    addresses: AddressBook,
    timeout: Duration,
}

impl ControlClient {
    /// Creates a client sending on behalf of `self_id`.
    pub fn new(self_id: PeerId, addresses: AddressBook, timeout: Duration) -> Self {
        Self {
            self_id,
            addresses,
            timeout,
        }
    }

    /// Endpoints used by this client.
    pub fn addresses(&self) -> &AddressBook {
        &self.addresses
    }

    async fn timed<F, T>(&self, peer: PeerId, fut: F) -> Result<T>
    where F: Future<Output = std::io::Result<T>> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(Error::Timeout(peer)),
        }
    }

    /// Open a control connection to `peer`.
    pub async fn connect(&self, peer: PeerId) -> Result<TcpStream> {
        let endpoint = self.addresses.control_endpoint(peer)?;
        match tokio::time::timeout(self.timeout, TcpStream::connect(endpoint)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(Error::Connect(peer, e)),
            Err(_) => Err(Error::Timeout(peer)),
        }
    }

    /// Send one message to `peer` over a fresh connection.
    pub async fn send(&self, peer: PeerId, msg: &ControlMessage) -> Result<()> {
        let mut stream = self.connect(peer).await?;
        tracing::debug!("send {} to peer {}", msg, peer);
        self.timed(peer, stream.write_all(&msg.to_frame())).await?;
        self.timed(peer, stream.shutdown()).await?;
        Ok(())
    }

    /// Ask `known` to place `peer` on the ring.
    pub async fn send_join_request(&self, known: PeerId, peer: PeerId) -> Result<()> {
        self.send(known, &ControlMessage::JoinRequest(JoinRequest { peer }))
            .await
    }

    /// Tell the joined peer `to` its successors.
    pub async fn send_join_response(
        &self,
        to: PeerId,
        first: PeerId,
        second: PeerId,
    ) -> Result<()> {
        self.send(
            to,
            &ControlMessage::JoinResponse(JoinResponse { first, second }),
        )
        .await
    }

    /// Announce the departure of `peer` with its successors to `to`.
    pub async fn send_depart(
        &self,
        to: PeerId,
        peer: PeerId,
        first: PeerId,
        second: PeerId,
    ) -> Result<()> {
        self.send(
            to,
            &ControlMessage::PeerDepart(PeerDepart {
                peer,
                first,
                second,
            }),
        )
        .await
    }

    /// Notify every tracked predecessor that this peer leaves. Returns how many were
    /// reached, a predecessor that cannot be reached is only logged.
    pub async fn send_depart_notice(
        &self,
        ring: &RingState,
        predecessors: &PredecessorTracker,
    ) -> Result<usize> {
        let Some((first, second)) = ring.successors()?.pair() else {
            tracing::warn!("Successors unset, no depart notice sent");
            return Ok(0);
        };
        let mut notified = 0;
        for pred in predecessors.list()? {
            match self.send_depart(pred, self.self_id, first, second).await {
                Ok(()) => notified += 1,
                Err(e) => tracing::warn!("Failed to notify predecessor {}: {}", pred, e),
            }
        }
        Ok(notified)
    }

    /// Ask `survivor` for its first successor after `departed` left abruptly. The answer
    /// arrives on the same connection within `wait`, otherwise [Error::Timeout].
    pub async fn send_abrupt_recovery_query(
        &self,
        survivor: PeerId,
        departed: PeerId,
        wait: Duration,
    ) -> Result<PeerId> {
        let stream = self.connect(survivor).await?;
        let (reader, mut writer) = stream.into_split();
        let query = ControlMessage::RecoveryQuery(RecoveryQuery {
            asking: self.self_id,
            departed,
        });
        tracing::debug!("send {} to peer {}", query, survivor);
        self.timed(survivor, writer.write_all(&query.to_frame()))
            .await?;

        // The survivor may block until its own successors are settled, which can take
        // longer than the I/O timeout.
        let mut reader = BufReader::new(reader);
        let header = tokio::time::timeout(wait, read_header(&mut reader))
            .await
            .map_err(|_| Error::Timeout(survivor))??
            .ok_or(Error::UnexpectedMessage("EOF"))?;
        match header.parse::<ControlMessage>()? {
            ControlMessage::RecoveryReply(reply) => Ok(reply.first),
            other => Err(Error::UnexpectedMessage(other.tag())),
        }
    }

    /// Send a store request for `file` to `target`.
    pub async fn send_store_request(
        &self,
        file: FileId,
        requester: PeerId,
        target: PeerId,
    ) -> Result<()> {
        self.send(
            target,
            &ControlMessage::Store(StoreRequest { file, requester }),
        )
        .await
    }

    /// Send a retrieve request for `file` to `target`.
    pub async fn send_retrieve_request(
        &self,
        file: FileId,
        requester: PeerId,
        target: PeerId,
    ) -> Result<()> {
        self.send(
            target,
            &ControlMessage::Retrieve(RetrieveRequest { file, requester }),
        )
        .await
    }
}
