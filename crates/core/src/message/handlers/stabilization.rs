use async_trait::async_trait;

use crate::dht::Ring;
use crate::dht::Slot;
use crate::error::Result;
use crate::message::types::ControlMessage;
use crate::message::types::PeerDepart;
use crate::message::types::RecoveryQuery;
use crate::message::types::RecoveryReply;
use crate::message::ControlProtocol;
use crate::message::Dispatch;
use crate::message::HandleMsg;

#[async_trait]
impl HandleMsg<PeerDepart> for ControlProtocol {
    async fn handle(&self, msg: &PeerDepart) -> Result<Dispatch> {
        self.ring.depart(msg.peer, msg.first, msg.second)?;
        Ok(Dispatch::Continue)
    }
}

/// Answer on the same connection with our first successor. Both slots must be
/// settled first, a half repaired list is never handed out.
#[async_trait]
impl HandleMsg<RecoveryQuery> for ControlProtocol {
    async fn handle(&self, msg: &RecoveryQuery) -> Result<Dispatch> {
        self.ring.wait_successor(Slot::Second).await?;
        let first = self.ring.wait_successor(Slot::First).await?;
        tracing::info!(
            "Peer {} left abruptly sending {} to {} as new peer",
            msg.departed,
            first,
            msg.asking
        );
        Ok(Dispatch::Reply(ControlMessage::RecoveryReply(
            RecoveryReply { first },
        )))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dht::PeerId;
    use crate::dht::Successors;
    use crate::tests::default::prepare_protocol;

    #[tokio::test]
    async fn test_depart_splices_successors() -> Result<()> {
        let (protocol, _dir) = prepare_protocol(10, Some((20, 30)));
        let depart = "PEER_DEPART 20 40 30".parse::<ControlMessage>()?;
        assert_eq!(protocol.dispatch(&depart).await?, Dispatch::Continue);
        assert_eq!(
            protocol.ring().successors()?,
            Successors::new(PeerId::new(30), PeerId::new(40))
        );

        let unrelated = "PEER_DEPART 99 1 2".parse::<ControlMessage>()?;
        assert_eq!(protocol.dispatch(&unrelated).await?, Dispatch::Continue);
        assert_eq!(
            protocol.ring().successors()?,
            Successors::new(PeerId::new(30), PeerId::new(40))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_recovery_query_waits_for_second_successor() -> Result<()> {
        let (protocol, _dir) = prepare_protocol(5, Some((12, 19)));
        let ring = protocol.ring();
        ring.clear(Slot::Second)?;

        let query = "RECOVERY_QUERY 26 19".parse::<ControlMessage>()?;
        let pending = {
            let protocol = protocol.clone();
            tokio::spawn(async move { protocol.dispatch(&query).await })
        };
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        ring.set(Slot::Second, PeerId::new(26))?;
        assert_eq!(
            pending.await.unwrap()?,
            Dispatch::Reply(ControlMessage::RecoveryReply(RecoveryReply {
                first: PeerId::new(12)
            }))
        );
        Ok(())
    }
}
