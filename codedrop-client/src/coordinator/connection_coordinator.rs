use crate::coordinator::negotiation::{Negotiation, transport_failure};
use crate::{CancelHandle, CoordinatorConfig, EstablishedLink, PeerTransport, TransportEvent};
use codedrop_core::{Code, Role, SignalError, SignalResult, SignalingChannel};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drives one local role through the rendezvous and the peer transport.
///
/// Works over any [`SignalingChannel`]: pushed events are used when the
/// channel delivers them, and every wait also polls with backoff.
pub struct ConnectionCoordinator {
    signaling: Arc<dyn SignalingChannel>,
    config: CoordinatorConfig,
    cancel: CancelHandle,
}

impl ConnectionCoordinator {
    pub fn new(signaling: Arc<dyn SignalingChannel>, config: CoordinatorConfig) -> Self {
        Self {
            signaling,
            config,
            cancel: CancelHandle::new(),
        }
    }

    /// Handle that interrupts any wait of this coordinator.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Initiator, first half: create the offer and publish it under a fresh code.
    ///
    /// On an occupied code a new one is drawn, up to `code_attempts` times.
    pub async fn publish_offer<T: PeerTransport>(
        &self,
        transport: T,
        events: mpsc::Receiver<TransportEvent>,
    ) -> SignalResult<PendingInitiator<T>> {
        self.publish_offer_with(transport, events, Code::generate).await
    }

    /// [`publish_offer`](Self::publish_offer) with codes drawn from `next_code`.
    pub async fn publish_offer_with<T: PeerTransport>(
        &self,
        transport: T,
        events: mpsc::Receiver<TransportEvent>,
        mut next_code: impl FnMut() -> Code + Send,
    ) -> SignalResult<PendingInitiator<T>> {
        if self.cancel.is_cancelled() {
            close_quietly(&transport).await;
            return Err(SignalError::Cancelled);
        }

        let offer = match transport.create_local_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                close_quietly(&transport).await;
                return Err(transport_failure(e));
            }
        };

        let attempts = self.config.code_attempts.max(1);
        let mut attempt = 0;
        let code = loop {
            attempt += 1;
            let code = next_code();
            match self.signaling.send_offer(&code, offer.clone()).await {
                Ok(()) => break code,
                Err(e @ SignalError::Conflict { .. }) if attempt < attempts => {
                    debug!("Code {} is taken ({}), drawing another", code, e);
                }
                Err(e) => {
                    warn!("Failed to publish offer: {}", e);
                    close_quietly(&transport).await;
                    return Err(e);
                }
            }
        };

        info!("Offer published under code {}", code);
        Ok(PendingInitiator {
            negotiation: Negotiation::new(
                Arc::clone(&self.signaling),
                self.config.clone(),
                self.cancel.clone(),
                code,
                Role::Initiator,
                transport,
                events,
            )
            .holding_code(),
        })
    }

    /// Full initiator run. `on_code` is called once the code can be shared.
    pub async fn run_initiator<T: PeerTransport>(
        &self,
        transport: T,
        events: mpsc::Receiver<TransportEvent>,
        on_code: impl FnOnce(&Code) + Send,
    ) -> SignalResult<EstablishedLink<T>> {
        let pending = self.publish_offer(transport, events).await?;
        on_code(pending.code());
        pending.establish().await
    }

    /// Responder run for a code the user typed in.
    pub async fn run_responder<T: PeerTransport>(
        &self,
        code: Code,
        transport: T,
        events: mpsc::Receiver<TransportEvent>,
    ) -> SignalResult<EstablishedLink<T>> {
        info!("Joining code {}", code);
        let mut negotiation = Negotiation::new(
            Arc::clone(&self.signaling),
            self.config.clone(),
            self.cancel.clone(),
            code,
            Role::Responder,
            transport,
            events,
        );
        match negotiation.run_responder().await {
            Ok(()) => Ok(negotiation.into_link()),
            Err(e) => {
                warn!("Responder for code {} failed: {}", negotiation.code(), e);
                negotiation.teardown().await;
                Err(e)
            }
        }
    }
}

/// Initiator whose offer is published and whose code can be shared.
pub struct PendingInitiator<T: PeerTransport> {
    negotiation: Negotiation<T>,
}

impl<T: PeerTransport> PendingInitiator<T> {
    pub fn code(&self) -> &Code {
        self.negotiation.code()
    }

    /// Wait for a responder and for the peer link to come up.
    pub async fn establish(self) -> SignalResult<EstablishedLink<T>> {
        let mut negotiation = self.negotiation;
        match negotiation.run_initiator().await {
            Ok(()) => Ok(negotiation.into_link()),
            Err(e) => {
                warn!("Initiator for code {} failed: {}", negotiation.code(), e);
                negotiation.teardown().await;
                Err(e)
            }
        }
    }

    /// Give up: release the code and the transport.
    pub async fn abort(self) {
        self.negotiation.teardown().await;
    }
}

async fn close_quietly<T: PeerTransport>(transport: &T) {
    if let Err(e) = transport.close().await {
        debug!("Transport close failed: {:#}", e);
    }
}
