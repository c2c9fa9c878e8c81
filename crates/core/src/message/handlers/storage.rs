use async_trait::async_trait;

use crate::dht::Ring;
use crate::dht::RingAction;
use crate::error::Result;
use crate::message::types::RetrieveRequest;
use crate::message::types::StoreRequest;
use crate::message::ControlProtocol;
use crate::message::Dispatch;
use crate::message::HandleMsg;

#[async_trait]
impl HandleMsg<StoreRequest> for ControlProtocol {
    async fn handle(&self, msg: &StoreRequest) -> Result<Dispatch> {
        let act = self
            .settled(|| self.ring.store(msg.file, msg.requester))
            .await?;
        if act == RingAction::Accept {
            self.contents.insert(msg.file);
        }
        self.send_remote_action(&act).await?;
        Ok(Dispatch::Continue)
    }
}

#[async_trait]
impl HandleMsg<RetrieveRequest> for ControlProtocol {
    async fn handle(&self, msg: &RetrieveRequest) -> Result<Dispatch> {
        let held = self.contents.contains(msg.file);
        let act = self
            .settled(|| self.ring.retrieve(msg.file, msg.requester, held))
            .await?;
        if let RingAction::NotFound(file) = act {
            return Ok(Dispatch::NotFound(file));
        }
        self.send_remote_action(&act).await?;
        Ok(Dispatch::Continue)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dht::FileId;
    use crate::message::ControlMessage;
    use crate::tests::default::prepare_protocol;

    #[tokio::test]
    async fn test_store_accepted_by_matching_peer() -> Result<()> {
        let (protocol, _dir) = prepare_protocol(44, Some((50, 60)));
        let store = "STORE 300 10".parse::<ControlMessage>()?;
        assert_eq!(protocol.dispatch(&store).await?, Dispatch::Continue);
        assert!(protocol.contents().contains(FileId::new(300)));
        Ok(())
    }

    #[tokio::test]
    async fn test_retrieve_of_own_request_not_found() -> Result<()> {
        let (protocol, _dir) = prepare_protocol(10, Some((20, 30)));
        let retrieve = "RETRIEVE 300 10".parse::<ControlMessage>()?;
        assert_eq!(
            protocol.dispatch(&retrieve).await?,
            Dispatch::NotFound(FileId::new(300))
        );
        Ok(())
    }
}
