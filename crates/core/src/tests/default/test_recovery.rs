use std::time::Duration;

use tokio::io::AsyncWriteExt;

use super::*;
use crate::dht::Slot;
use crate::error::Error;
use crate::message::RecoveryQuery;
use crate::message::RecoveryReply;

#[tokio::test]
async fn test_abrupt_departure_rotates_successors() -> Result<()> {
    let addresses = gen_addresses();
    // 19 never starts
    let n5 = spawn_peer(addresses, 5, FAST, Some((12, 19))).await;
    let n12 = spawn_peer(addresses, 12, FAST, Some((19, 26))).await;
    let _n26 = spawn_peer(addresses, 26, FAST, Some((5, 12))).await;

    wait_for_successors(&n12, 26, 5).await;
    wait_for_successors(&n5, 12, 26).await;
    assert!(!n12.handle.is_finished());
    Ok(())
}

#[tokio::test]
async fn test_three_peer_ring_losing_one_terminates() -> Result<()> {
    let addresses = gen_addresses();
    // 19 never starts, 5 and 12 both lose it in the same cycles and ask each other
    let mut n5 = spawn_peer(addresses, 5, FAST, Some((12, 19))).await;
    let mut n12 = spawn_peer(addresses, 12, FAST, Some((19, 5))).await;

    let limit = Duration::from_secs(10);
    let first = tokio::select! {
        res = &mut n5.handle => res,
        res = &mut n12.handle => res,
        _ = tokio::time::sleep(limit) => panic!("no peer terminated within {:?}", limit),
    };
    match first.unwrap() {
        Err(e @ Error::RecoveryFailed { .. }) => assert!(e.is_fatal()),
        other => panic!("unexpected result {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_ring_too_small_to_recover_is_fatal() -> Result<()> {
    let addresses = gen_addresses();
    let survivor = FakeControl::bind(&addresses, 5).await;
    let mut n12 = spawn_peer(addresses, 12, FAST, Some((19, 5))).await;

    // 19 stops answering, 12 asks its second successor
    let (msg, reader) = survivor.next_message().await;
    assert_eq!(
        msg,
        ControlMessage::RecoveryQuery(RecoveryQuery {
            asking: peer(12),
            departed: peer(19)
        })
    );
    let reply = ControlMessage::RecoveryReply(RecoveryReply { first: peer(12) });
    let mut stream = reader.into_inner();
    stream.write_all(&reply.to_frame()).await?;

    let res = tokio::time::timeout(Duration::from_secs(10), &mut n12.handle)
        .await
        .expect("peer terminated")
        .unwrap();
    match res {
        Err(e @ Error::RecoveryFailed { .. }) => assert!(e.is_fatal()),
        other => panic!("unexpected result {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_both_successors_lost_is_fatal() -> Result<()> {
    let node = PeerBuilder::new(peer(12), QUIET)
        .addresses(gen_addresses())
        .build()?;
    node.init_as_founder(peer(19), peer(26))?;
    node.ring().clear(Slot::Second)?;

    let res = node.heartbeat().recover(Slot::First).await;
    assert!(matches!(res, Err(Error::BothSuccessorsLost)));
    assert!(node.successors()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_recovery_query_is_fatal() -> Result<()> {
    // nobody listens on 26
    let node = PeerBuilder::new(peer(12), QUIET)
        .addresses(gen_addresses())
        .io_timeout(Duration::from_millis(500))
        .build()?;
    node.init_as_founder(peer(19), peer(26))?;

    let res = node.heartbeat().recover(Slot::First).await;
    assert!(matches!(
        res,
        Err(Error::RecoveryFailed { survivor, departed, .. })
            if survivor == peer(26) && departed == peer(19)
    ));
    Ok(())
}

#[tokio::test]
async fn test_graceful_departure_notifies_predecessors() -> Result<()> {
    let addresses = gen_addresses();
    let n5 = spawn_peer(addresses, 5, FAST, Some((12, 19))).await;
    let n12 = spawn_peer(addresses, 12, FAST, Some((19, 26))).await;
    let _n19 = spawn_peer(addresses, 19, FAST, Some((26, 5))).await;
    let n26 = spawn_peer(addresses, 26, FAST, Some((5, 12))).await;

    let departing = &n12.peer;
    wait_until("12 to learn its predecessors", || async move {
        departing.predecessors().map(|p| p.len() == 2).unwrap_or(false)
    })
    .await;
    let mut preds = departing.predecessors()?;
    preds.sort();
    assert_eq!(preds, vec![peer(5), peer(26)]);

    departing.shutdown(n12.token.clone()).await?;

    wait_for_successors(&n5, 19, 26).await;
    wait_for_successors(&n26, 5, 19).await;
    Ok(())
}
