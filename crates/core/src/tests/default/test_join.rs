use std::time::Duration;

use super::*;
use crate::dht::Successors;
use crate::message::ControlClient;
use crate::message::JoinRequest;
use crate::message::JoinResponse;
use crate::peer::Entry;

#[tokio::test]
async fn test_join_request_makes_joiner_first_successor() -> Result<()> {
    let addresses = gen_addresses();
    let n10 = spawn_peer(addresses, 10, QUIET, Some((20, 30))).await;
    let joiner = FakeControl::bind(&addresses, 15).await;

    let client = ControlClient::new(peer(15), addresses, Duration::from_secs(1));
    client.send_join_request(peer(10), peer(15)).await?;

    let (msg, _) = joiner.next_message().await;
    assert_eq!(
        msg,
        ControlMessage::JoinResponse(JoinResponse {
            first: peer(20),
            second: peer(30)
        })
    );
    assert_eq!(
        n10.peer.successors()?,
        Successors::new(peer(15), peer(20))
    );
    Ok(())
}

#[tokio::test]
async fn test_join_travels_along_the_ring() -> Result<()> {
    let addresses = gen_addresses();
    let n5 = spawn_peer(addresses, 5, QUIET, Some((12, 19))).await;
    let n12 = spawn_peer(addresses, 12, QUIET, Some((19, 5))).await;
    let _n19 = spawn_peer(addresses, 19, QUIET, Some((5, 12))).await;
    let n15 = spawn_peer(addresses, 15, QUIET, None).await;

    n15.peer.init_as_joiner(peer(5)).await?;
    let joined = tokio::time::timeout(Duration::from_secs(10), n15.peer.wait_joined())
        .await
        .expect("join response arrived")?;

    assert_eq!(joined, (peer(19), peer(5)));
    assert_eq!(n5.peer.successors()?, Successors::new(peer(12), peer(15)));
    assert_eq!(n12.peer.successors()?, Successors::new(peer(15), peer(19)));
    Ok(())
}

#[tokio::test]
async fn test_awaiting_peer_closes_other_messages() -> Result<()> {
    let addresses = gen_addresses();
    let n15 = spawn_peer(addresses, 15, QUIET, None).await;
    let client = ControlClient::new(peer(10), addresses, Duration::from_secs(1));

    client
        .send_store_request(crate::dht::FileId::new(300), peer(10), peer(15))
        .await?;
    client.send_join_response(peer(15), peer(20), peer(30)).await?;

    let joined = tokio::time::timeout(Duration::from_secs(10), n15.peer.wait_joined())
        .await
        .expect("join response arrived")?;
    assert_eq!(joined, (peer(20), peer(30)));
    assert!(n15.peer.contents().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_started_joiner_announces_after_listening() -> Result<()> {
    let addresses = gen_addresses();
    let known = FakeControl::bind(&addresses, 10).await;
    let n15 = Arc::new(
        PeerBuilder::new(peer(15), QUIET)
            .addresses(addresses)
            .build()?,
    );
    let token = CancellationToken::new();
    let handle = n15
        .start(Entry::Joiner { known: peer(10) }, token.clone())
        .await?;

    let (msg, _) = known.next_message().await;
    assert_eq!(msg, ControlMessage::JoinRequest(JoinRequest { peer: peer(15) }));

    // the control endpoint already listens for the answer
    let client = ControlClient::new(peer(10), addresses, Duration::from_secs(1));
    client
        .send_join_response(peer(15), peer(20), peer(30))
        .await?;
    let joined = tokio::time::timeout(Duration::from_secs(10), n15.wait_joined())
        .await
        .expect("join response handled")?;
    assert_eq!(joined, (peer(20), peer(30)));
    assert!(!handle.is_finished());
    token.cancel();
    Ok(())
}
