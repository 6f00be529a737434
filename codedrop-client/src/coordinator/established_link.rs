use crate::coordinator::negotiation::transport_failure;
use crate::{PeerTransport, TransportEvent};
use codedrop_core::{Code, Role, SignalResult, SignalingChannel, TransferPayload};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A connected peer link, handed over once the data channel is open.
pub struct EstablishedLink<T: PeerTransport> {
    code: Code,
    role: Role,
    signaling: Arc<dyn SignalingChannel>,
    transport: T,
    events: mpsc::Receiver<TransportEvent>,
    /// Payloads that arrived while the link was still being negotiated.
    inbox: VecDeque<TransferPayload>,
    closed: bool,
}

impl<T: PeerTransport> EstablishedLink<T> {
    pub(crate) fn new(
        code: Code,
        role: Role,
        signaling: Arc<dyn SignalingChannel>,
        transport: T,
        events: mpsc::Receiver<TransportEvent>,
        inbox: VecDeque<TransferPayload>,
    ) -> Self {
        Self {
            code,
            role,
            signaling,
            transport,
            events,
            inbox,
            closed: false,
        }
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn send(&self, payload: &TransferPayload) -> SignalResult<()> {
        debug!("Sending {} payload on code {}", payload.kind(), self.code);
        self.transport.send(payload).await.map_err(transport_failure)
    }

    /// Next inbound payload, or `None` once the link is closed or failed.
    pub async fn recv(&mut self) -> Option<TransferPayload> {
        if let Some(payload) = self.inbox.pop_front() {
            return Some(payload);
        }
        if self.closed {
            return None;
        }

        while let Some(event) = self.events.recv().await {
            match event {
                TransportEvent::DataReceived(payload) => return Some(payload),
                TransportEvent::StateChanged(state) if state.is_terminal() => {
                    info!("Peer link for code {} {}", self.code, state);
                    break;
                }
                TransportEvent::StateChanged(_) => {}
                // ICE keeps gathering after the link is up; the peer no longer needs them
                TransportEvent::CandidateGenerated(_) => {}
            }
        }

        self.closed = true;
        None
    }

    /// Release the code at the relay and close the transport.
    pub async fn close(self) -> SignalResult<()> {
        if let Err(e) = self.signaling.clear_connection(&self.code).await {
            warn!("clear-connection for code {} failed: {}", self.code, e);
        }
        self.transport.close().await.map_err(transport_failure)
    }
}
