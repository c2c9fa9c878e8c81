use std::time::Duration;

use super::*;
use crate::dht::FileId;
use crate::message::ControlClient;
use crate::message::StoreRequest;

#[tokio::test]
async fn test_store_forwarded_to_first_successor() -> Result<()> {
    let addresses = gen_addresses();
    let n10 = spawn_peer(addresses, 10, QUIET, Some((50, 60))).await;
    let next = FakeControl::bind(&addresses, 50).await;

    n10.peer.store(FileId::new(300)).await?;

    let (msg, _) = next.next_message().await;
    assert_eq!(
        msg,
        ControlMessage::Store(StoreRequest {
            file: FileId::new(300),
            requester: peer(10)
        })
    );
    assert!(n10.peer.contents().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_store_then_retrieve_across_the_ring() -> Result<()> {
    let addresses = gen_addresses();
    let n10 = spawn_peer(addresses, 10, QUIET, Some((20, 30))).await;
    let n20 = spawn_peer(addresses, 20, QUIET, Some((30, 10))).await;
    let n30 = spawn_peer(addresses, 30, QUIET, Some((10, 20))).await;

    // 300 hashes to 44, beyond the largest id, the tail keeps it
    let file = FileId::new(300);
    n10.peer.store(file).await?;
    let holder = &n30.peer;
    wait_until("30 to accept the file", || async move {
        holder.contents().contains(&file)
    })
    .await;
    assert!(n10.peer.contents().is_empty());
    assert!(n20.peer.contents().is_empty());

    tokio::fs::write(n30.dir.path().join("300.txt"), b"three hundred").await?;
    n10.peer.request(file).await?;

    let received = n10.dir.path().join("received_300.txt");
    let path = &received;
    wait_until("the transfer to land", || async move {
        tokio::fs::read(path)
            .await
            .map(|bytes| bytes == b"three hundred")
            .unwrap_or(false)
    })
    .await;
    // no pdf variant was stored
    assert!(!n10.dir.path().join("received_300.pdf").exists());
    Ok(())
}

#[tokio::test]
async fn test_transfer_over_the_wire() -> Result<()> {
    let addresses = gen_addresses();
    let n10 = spawn_peer(addresses, 10, QUIET, Some((20, 30))).await;
    let client = ControlClient::new(peer(30), addresses, Duration::from_secs(1));

    let mut stream = client.connect(peer(10)).await?;
    let header = ControlMessage::Transfer(crate::message::Transfer {
        file: FileId::new(7),
        filename: "7.pdf".to_string(),
    });
    tokio::io::AsyncWriteExt::write_all(&mut stream, &header.to_frame()).await?;
    tokio::io::AsyncWriteExt::write_all(&mut stream, b"%PDF\0\nbinary").await?;
    drop(stream);

    let received = n10.dir.path().join("received_7.pdf");
    let path = &received;
    wait_until("the transfer to land", || async move {
        tokio::fs::read(path)
            .await
            .map(|bytes| bytes == b"%PDF\0\nbinary")
            .unwrap_or(false)
    })
    .await;
    Ok(())
}
