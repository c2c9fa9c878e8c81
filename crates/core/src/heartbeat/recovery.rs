use super::HeartbeatEngine;
use crate::consts::RECOVERY_REPLY_INTERVALS;
use crate::dht::Slot;
use crate::error::Error;
use crate::error::Result;

impl HeartbeatEngine {
    /// Repair the successor list after the peer in `slot` left abruptly.
    ///
    /// The surviving successor is asked for its own first successor, which becomes our
    /// new second. There is no other source of topology: losing both successors, or a
    /// failed or unanswered query, is fatal. Two peers recovering from the same loss
    /// can wait on each other, the bounded wait for the reply breaks that cycle.
    pub async fn recover(&self, slot: Slot) -> Result<()> {
        let Some(left) = self.ring.clear(slot)? else {
            tracing::debug!("{} successor already cleared, nothing to recover", slot);
            return Ok(());
        };
        tracing::info!("Peer {} is no longer alive", left);

        let Some(survivor) = self.ring.successor(slot.other())? else {
            tracing::error!("Lost both successors, no peer left to ask");
            return Err(Error::BothSuccessorsLost);
        };

        let failed = |reason: String| Error::RecoveryFailed {
            survivor,
            departed: left,
            reason,
        };
        let replacement = self
            .client
            .send_abrupt_recovery_query(
                survivor,
                left,
                self.ring.interval() * RECOVERY_REPLY_INTERVALS,
            )
            .await
            .map_err(|e| failed(e.to_string()))?;
        if replacement == self.ring.self_id() {
            return Err(failed("ring too small to replace a lost successor".to_string()));
        }
        self.ring
            .replace_both(survivor, replacement)
            .map_err(|e| failed(e.to_string()))?;

        tracing::info!("My new first successor is Peer {}", survivor);
        tracing::info!("My new second successor is Peer {}", replacement);
        Ok(())
    }
}
