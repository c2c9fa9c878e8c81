use async_trait::async_trait;

use crate::dht::Ring;
use crate::error::Error;
use crate::error::Result;
use crate::message::types::JoinRequest;
use crate::message::types::JoinResponse;
use crate::message::ControlProtocol;
use crate::message::Dispatch;
use crate::message::HandleMsg;

#[async_trait]
impl HandleMsg<JoinRequest> for ControlProtocol {
    async fn handle(&self, msg: &JoinRequest) -> Result<Dispatch> {
        let act = self.settled(|| self.ring.join(msg.peer)).await?;
        self.send_remote_action(&act).await?;
        Ok(Dispatch::Continue)
    }
}

/// Only a peer without successors accepts its join response, see
/// [ControlProtocol::dispatch].
#[async_trait]
impl HandleMsg<JoinResponse> for ControlProtocol {
    async fn handle(&self, msg: &JoinResponse) -> Result<Dispatch> {
        if !self.ring.successors()?.is_empty() {
            return Err(Error::UnexpectedMessage("JOIN_RESPONSE"));
        }
        self.ring.replace_both(msg.first, msg.second)?;
        tracing::info!("My first successor is Peer {}", msg.first);
        tracing::info!("My second successor is Peer {}", msg.second);
        Ok(Dispatch::Close)
    }
}
