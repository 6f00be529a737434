use anyhow::Result;
use async_trait::async_trait;
use codedrop_core::TransferPayload;

/// The peer-connection capability the coordinator drives.
///
/// Implementations report candidates, state changes and inbound payloads as
/// [`TransportEvent`](crate::TransportEvent)s on the channel they were built with.
/// Offers, answers and candidates are opaque strings.
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    /// Create an offer and make it the local description.
    async fn create_local_offer(&self) -> Result<String>;

    /// Apply the remote offer and return the local answer.
    async fn create_local_answer(&self, remote_offer: String) -> Result<String>;

    async fn apply_remote_answer(&self, answer: String) -> Result<()>;

    async fn add_remote_candidate(&self, candidate: String) -> Result<()>;

    async fn send(&self, payload: &TransferPayload) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
