use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dht::AddressBook;
use crate::dht::PeerId;
use crate::dht::Successors;
use crate::error::Result;
use crate::message::read_header;
use crate::message::ControlMessage;
use crate::message::ControlProtocol;
use crate::peer::Peer;
use crate::peer::PeerBuilder;
use crate::tests::gen_addresses;

mod test_heartbeat;
mod test_join;
mod test_recovery;
mod test_storage;

/// Interval of peers that should never probe during a test.
pub const QUIET: Duration = Duration::from_secs(600);
/// Interval of peers whose heartbeats are part of the test.
pub const FAST: Duration = Duration::from_millis(100);

pub fn peer(id: u32) -> PeerId {
    PeerId::new(id)
}

/// Control protocol of a peer that is not listening anywhere.
pub fn prepare_protocol(id: u32, successors: Option<(u32, u32)>) -> (ControlProtocol, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let node = PeerBuilder::new(peer(id), QUIET)
        .addresses(gen_addresses())
        .storage_dir(dir.path())
        .build()
        .unwrap();
    if let Some((first, second)) = successors {
        node.init_as_founder(peer(first), peer(second)).unwrap();
    }
    (node.protocol().clone(), dir)
}

/// A running peer. Dropping it stops all of its loops.
pub struct Node {
    pub peer: Arc<Peer>,
    pub dir: TempDir,
    pub token: CancellationToken,
    pub handle: JoinHandle<Result<()>>,
}

impl Drop for Node {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Build and start a peer, endpoints are bound before this returns.
pub async fn spawn_peer(
    addresses: AddressBook,
    id: u32,
    interval: Duration,
    successors: Option<(u32, u32)>,
) -> Node {
    let dir = tempfile::tempdir().unwrap();
    let node = Arc::new(
        PeerBuilder::new(peer(id), interval)
            .addresses(addresses)
            .io_timeout(Duration::from_secs(1))
            .storage_dir(dir.path())
            .build()
            .unwrap(),
    );
    if let Some((first, second)) = successors {
        node.init_as_founder(peer(first), peer(second)).unwrap();
    }
    let sockets = node.bind().await.unwrap();
    let token = CancellationToken::new();
    let handle = {
        let node = node.clone();
        let token = token.clone();
        tokio::spawn(async move { node.serve(sockets, token).await })
    };
    Node {
        peer: node,
        dir,
        token,
        handle,
    }
}

/// Poll `check` until it holds, panics after a few seconds.
pub async fn wait_until<F, Fut>(what: &str, check: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !check().await {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until the successors of `node` are `(first, second)`.
pub async fn wait_for_successors(node: &Node, first: u32, second: u32) {
    let expected = Successors::new(peer(first), peer(second));
    let ring = node.peer.ring();
    let ring = &ring;
    let what = format!("peer {} to settle on {:?}", ring.self_id(), expected);
    wait_until(&what, || async move {
        ring.successors().map(|s| s == expected).unwrap_or(false)
    })
    .await
}

/// Stand-in for a peer, records what is sent to its control endpoint.
pub struct FakeControl {
    listener: TcpListener,
}

impl FakeControl {
    pub async fn bind(addresses: &AddressBook, id: u32) -> Self {
        let endpoint = addresses.control_endpoint(peer(id)).unwrap();
        Self {
            listener: TcpListener::bind(endpoint).await.unwrap(),
        }
    }

    /// Accept one connection and decode its first header.
    pub async fn next_message(&self) -> (ControlMessage, BufReader<tokio::net::TcpStream>) {
        let accept = async {
            let (stream, _) = self.listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let header = read_header(&mut reader).await.unwrap().unwrap();
            (header.parse::<ControlMessage>().unwrap(), reader)
        };
        tokio::time::timeout(Duration::from_secs(10), accept)
            .await
            .expect("no control message arrived")
    }
}

/// Stand-in for a peer's heartbeat endpoint.
pub async fn bind_fake_heartbeat(addresses: &AddressBook, id: u32) -> UdpSocket {
    UdpSocket::bind(addresses.heartbeat_endpoint(peer(id)).unwrap())
        .await
        .unwrap()
}

/// Receive one datagram as text.
pub async fn recv_text(socket: &UdpSocket) -> String {
    let mut buf = vec![0u8; 2048];
    let (len, _) = tokio::time::timeout(Duration::from_secs(10), socket.recv_from(&mut buf))
        .await
        .expect("no datagram arrived")
        .unwrap();
    String::from_utf8(buf[..len].to_vec()).unwrap()
}
