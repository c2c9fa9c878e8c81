#![warn(missing_docs)]
//! This module implemented the control protocol of the ring.
//!
//! Every accepted connection runs a small loop: read a header, decode it, dispatch it
//! to the matching [HandleMsg] implementation. Handlers commit local state first and
//! send whatever the protocol requires afterwards, outside of any lock.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::frame::read_header;
use super::types::ControlMessage;
use super::types::Transfer;
use super::ControlClient;
use crate::dht::FileId;
use crate::dht::PredecessorTracker;
use crate::dht::RemoteAction;
use crate::dht::RingAction;
use crate::dht::RingState;
use crate::error::Error;
use crate::error::Result;
use crate::storage::ContentStore;
use crate::storage::FileTransfer;

/// Operator and Handler for joining
pub mod join;
/// Operator and handler for departures and abrupt recovery
pub mod stabilization;
/// Operator and Handler for Storage
pub mod storage;

/// What the connection loop does after a message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep reading from the connection.
    Continue,
    /// Close the connection.
    Close,
    /// Write the message back on the same connection, then keep reading.
    Reply(ControlMessage),
    /// A retrieve issued by this peer found the file nowhere on the ring.
    NotFound(FileId),
}

/// ControlProtocol will manage resources.
#[derive(Clone)]
pub struct ControlProtocol {
    ring: Arc<RingState>,
    predecessors: Arc<PredecessorTracker>,
    contents: Arc<ContentStore>,
    client: ControlClient,
    transfer: Arc<dyn FileTransfer>,
    file_variants: Arc<Vec<String>>,
}

/// Generic trait for handle message ,inspired by Actor-Model.
#[async_trait]
pub trait HandleMsg<T> {
    /// Message handler.
    async fn handle(&self, msg: &T) -> Result<Dispatch>;
}

impl ControlProtocol {
    /// Create a new ControlProtocol instance.
    pub fn new(
        ring: Arc<RingState>,
        predecessors: Arc<PredecessorTracker>,
        contents: Arc<ContentStore>,
        client: ControlClient,
        transfer: Arc<dyn FileTransfer>,
        file_variants: Vec<String>,
    ) -> Self {
        Self {
            ring,
            predecessors,
            contents,
            client,
            transfer,
            file_variants: Arc::new(file_variants),
        }
    }

    /// Ring state this protocol mutates.
    pub fn ring(&self) -> Arc<RingState> {
        self.ring.clone()
    }

    /// Peers that probed us recently.
    pub fn predecessors(&self) -> Arc<PredecessorTracker> {
        self.predecessors.clone()
    }

    /// Files held by this peer.
    pub fn contents(&self) -> Arc<ContentStore> {
        self.contents.clone()
    }

    /// Outbound side of the protocol.
    pub fn client(&self) -> &ControlClient {
        &self.client
    }

    /// Bind the control endpoint of this peer.
    pub async fn bind(&self) -> Result<TcpListener> {
        let endpoint = self
            .client
            .addresses()
            .control_endpoint(self.ring.self_id())?;
        Ok(TcpListener::bind(endpoint).await?)
    }

    /// Bind and serve until cancelled.
    pub async fn listen(&self, token: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, token).await
    }

    /// Accept connections until cancelled, each one handled by its own task.
    pub async fn serve(&self, listener: TcpListener, token: CancellationToken) -> Result<()> {
        tracing::debug!(
            "peer {} accepting control connections on {:?}",
            self.ring.self_id(),
            listener.local_addr()
        );
        loop {
            let accepted = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                accepted = listener.accept() => accepted,
            };
            let (stream, addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("Failed to accept control connection: {}", e);
                    continue;
                }
            };
            let this = self.clone();
            let token = token.child_token();
            tokio::spawn(async move {
                if let Err(e) = this.handle_connection(stream, token).await {
                    tracing::error!("Error: {}, closing connection from {}", e, addr);
                }
            }
            .in_current_span());
        }
    }

    /// Run the request loop of one connection. The stream is dropped on every exit.
    pub async fn handle_connection(&self, stream: TcpStream, token: CancellationToken) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        loop {
            let header = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                header = read_header(&mut reader) => header?,
            };
            let Some(header) = header else {
                return Ok(());
            };
            let msg = header.parse::<ControlMessage>()?;
            tracing::debug!("peer {} received {}", self.ring.self_id(), msg);

            if let ControlMessage::Transfer(transfer) = &msg {
                self.admit(&msg)?;
                self.accept_transfer(transfer, &mut reader).await?;
                return Ok(());
            }

            let dispatch = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                dispatch = self.dispatch(&msg) => dispatch?,
            };
            match dispatch {
                Dispatch::Continue | Dispatch::NotFound(_) => {}
                Dispatch::Close => return Ok(()),
                Dispatch::Reply(reply) => writer.write_all(&reply.to_frame()).await?,
            }
        }
    }

    /// While both successors are unset, only a join response is acceptable.
    fn admit(&self, msg: &ControlMessage) -> Result<()> {
        if self.ring.successors()?.is_empty() && !matches!(msg, ControlMessage::JoinResponse(_)) {
            return Err(Error::AwaitingJoin(msg.tag()));
        }
        Ok(())
    }

    /// Route a decoded message to its handler.
    pub async fn dispatch(&self, msg: &ControlMessage) -> Result<Dispatch> {
        self.admit(msg)?;
        match msg {
            ControlMessage::JoinRequest(m) => self.handle(m).await,
            ControlMessage::JoinResponse(m) => self.handle(m).await,
            ControlMessage::PeerDepart(m) => self.handle(m).await,
            ControlMessage::RecoveryQuery(m) => self.handle(m).await,
            ControlMessage::Store(m) => self.handle(m).await,
            ControlMessage::Retrieve(m) => self.handle(m).await,
            ControlMessage::RecoveryReply(_) | ControlMessage::Transfer(_) => {
                Err(Error::UnexpectedMessage(msg.tag()))
            }
        }
    }

    async fn accept_transfer(
        &self,
        msg: &Transfer,
        reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    ) -> Result<()> {
        let written = self.transfer.accept_file(&msg.filename, reader).await?;
        tracing::debug!("accepted {} bytes of file {}", written, msg.file);
        Ok(())
    }

    /// Wait for both successors, then run `op`. A recovery may clear a slot between
    /// the wait and `op`, in which case we wait again.
    pub(crate) async fn settled<T, F>(&self, op: F) -> Result<T>
    where F: Fn() -> Result<T> + Send {
        loop {
            self.ring.wait_successors().await?;
            match op() {
                Err(Error::SuccessorsUnset) => continue,
                res => return res,
            }
        }
    }

    /// Send the message a [RingAction] asks for.
    pub(crate) async fn send_remote_action(&self, act: &RingAction) -> Result<()> {
        match act {
            RingAction::None | RingAction::Accept | RingAction::NotFound(_) => Ok(()),
            RingAction::RemoteAction(next, RemoteAction::Join(peer)) => {
                self.client.send_join_request(*next, *peer).await
            }
            RingAction::RemoteAction(next, RemoteAction::JoinResponse { first, second }) => {
                self.client.send_join_response(*next, *first, *second).await
            }
            RingAction::RemoteAction(next, RemoteAction::Store { file, requester }) => {
                self.client
                    .send_store_request(*file, *requester, *next)
                    .await
            }
            RingAction::RemoteAction(next, RemoteAction::Retrieve { file, requester }) => {
                self.client
                    .send_retrieve_request(*file, *requester, *next)
                    .await
            }
            RingAction::RemoteAction(next, RemoteAction::Transfer(file)) => {
                for ext in self.file_variants.iter() {
                    if let Err(e) = self.transfer.send_file(*file, ext, *next).await {
                        tracing::warn!("Failed to send {}.{} to peer {}: {}", file, ext, next, e);
                    }
                }
                Ok(())
            }
        }
    }
}
