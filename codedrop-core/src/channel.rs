use crate::model::{
    Code, Role, SignalAction, SignalError, SignalEvent, SignalResponse, SignalResult,
};
use async_trait::async_trait;

/// Канал, через который координатор общается с relay.
///
/// An implementation only has to provide [`request`](Self::request) and
/// [`next_event`](Self::next_event); the logical actions are built on top.
/// Poll-only channels return `None` from `next_event` and callers fall back
/// to re-issuing reads.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Issue one action and wait for its reply. Failed replies come back as `Err`.
    async fn request(&self, code: &Code, action: SignalAction) -> SignalResult<SignalResponse>;

    /// Next event pushed by the relay, or `None` once there is nothing more to push.
    async fn next_event(&self) -> Option<SignalEvent>;

    async fn send_offer(&self, code: &Code, offer: String) -> SignalResult<()> {
        self.request(code, SignalAction::SendOffer { offer }).await?;
        Ok(())
    }

    async fn get_offer(&self, code: &Code) -> SignalResult<String> {
        let reply = self.request(code, SignalAction::GetOffer).await?;
        reply
            .offer
            .ok_or_else(|| SignalError::InvalidPayload("get-offer reply without offer".into()))
    }

    async fn wait_for_offer(&self, code: &Code) -> SignalResult<()> {
        self.request(code, SignalAction::WaitForOffer).await?;
        Ok(())
    }

    async fn send_answer(&self, code: &Code, answer: String) -> SignalResult<()> {
        self.request(code, SignalAction::SendAnswer { answer }).await?;
        Ok(())
    }

    async fn get_answer(&self, code: &Code) -> SignalResult<String> {
        let reply = self.request(code, SignalAction::GetAnswer).await?;
        reply
            .answer
            .ok_or_else(|| SignalError::InvalidPayload("get-answer reply without answer".into()))
    }

    async fn send_ice_candidate(&self, code: &Code, candidate: String, role: Role) -> SignalResult<()> {
        self.request(code, SignalAction::SendIceCandidate { candidate, role })
            .await?;
        Ok(())
    }

    /// Pop the oldest candidate sent by the other side of `role`.
    async fn get_ice_candidate(&self, code: &Code, role: Role) -> SignalResult<String> {
        let reply = self
            .request(code, SignalAction::GetIceCandidate { role })
            .await?;
        reply.candidate.ok_or_else(|| {
            SignalError::InvalidPayload("get-ice-candidate reply without candidate".into())
        })
    }

    async fn clear_connection(&self, code: &Code) -> SignalResult<()> {
        self.request(code, SignalAction::ClearConnection).await?;
        Ok(())
    }
}
