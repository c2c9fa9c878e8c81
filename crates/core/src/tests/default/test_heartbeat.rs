use super::*;
use crate::message::PingMessage;
use crate::peer::Entry;

#[tokio::test]
async fn test_receiver_answers_and_records_predecessor() -> Result<()> {
    let addresses = gen_addresses();
    let n10 = spawn_peer(addresses, 10, QUIET, Some((20, 30))).await;
    let pinger = bind_fake_heartbeat(&addresses, 7).await;
    let target = addresses.heartbeat_endpoint(peer(10))?;

    pinger.send_to(b"garbage", target).await?;
    pinger.send_to(b"REQUEST x 7", target).await?;
    pinger.send_to(b"REQUEST 4 7", target).await?;

    let reply = recv_text(&pinger).await.parse::<PingMessage>()?;
    assert_eq!(reply, PingMessage::Acknowledge {
        seq: 4,
        sender: peer(10)
    });
    assert_eq!(n10.peer.predecessors()?, vec![peer(7)]);
    Ok(())
}

#[tokio::test]
async fn test_ticker_probes_successors() -> Result<()> {
    let addresses = gen_addresses();
    let first = bind_fake_heartbeat(&addresses, 20).await;
    let second = bind_fake_heartbeat(&addresses, 30).await;
    let n10 = spawn_peer(addresses, 10, FAST, Some((20, 30))).await;

    // startup probe, then the periodic ones
    assert_eq!(recv_text(&first).await, "REQUEST 0 10");
    assert_eq!(recv_text(&second).await, "REQUEST 0 10");
    assert_eq!(recv_text(&first).await, "REQUEST 1 10");

    let ack = PingMessage::Acknowledge {
        seq: 1,
        sender: peer(20),
    };
    first
        .send_to(
            ack.to_string().as_bytes(),
            addresses.heartbeat_endpoint(peer(10))?,
        )
        .await?;
    assert_eq!(recv_text(&first).await, "REQUEST 2 10");

    let probes = n10.peer.heartbeat().probes();
    let acked = &probes;
    wait_until("the ack to be recorded", || async move {
        acked
            .target(crate::dht::Slot::First)
            .ok()
            .flatten()
            .map(|t| t.last_sequence_acked == 1)
            .unwrap_or(false)
    })
    .await;
    Ok(())
}

#[tokio::test]
async fn test_started_founder_sends_startup_probes() -> Result<()> {
    let addresses = gen_addresses();
    let first = bind_fake_heartbeat(&addresses, 20).await;
    let second = bind_fake_heartbeat(&addresses, 30).await;
    let n10 = Arc::new(
        PeerBuilder::new(peer(10), QUIET)
            .addresses(addresses)
            .build()?,
    );
    let token = CancellationToken::new();
    let entry = Entry::Founder {
        first: peer(20),
        second: peer(30),
    };
    let _handle = n10.start(entry, token.clone()).await?;

    // the periodic probes are far away, only seeded successors get these
    assert_eq!(recv_text(&first).await, "REQUEST 0 10");
    assert_eq!(recv_text(&second).await, "REQUEST 0 10");
    token.cancel();
    Ok(())
}
