use crate::rendezvous::{Delivery, RendezvousProtocol};
use crate::session::{SessionStore, SessionSummary};
use codedrop_core::{HandleId, IceServerConfig, ServerFrame, SignalRequest, SignalResponse};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

struct SignalingInner {
    /// Outbox per connected handle: `HandleId -> frames to write to its socket`.
    handles: DashMap<HandleId, mpsc::UnboundedSender<ServerFrame>>,
    protocol: RendezvousProtocol,
    ice_servers: Vec<IceServerConfig>,
}

/// Push realization of the signaling channel.
///
/// Owns the rendezvous protocol and the outboxes of every connected handle.
/// Clones share state.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(session_max_age: Duration, ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                handles: DashMap::new(),
                protocol: RendezvousProtocol::new(SessionStore::new(), session_max_age),
                ice_servers,
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn protocol(&self) -> &RendezvousProtocol {
        &self.inner.protocol
    }

    /// Register a new handle; the receiver yields every frame addressed to it,
    /// starting with the welcome frame.
    pub fn connect(&self) -> (HandleId, mpsc::UnboundedReceiver<ServerFrame>) {
        let handle = HandleId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let welcome = ServerFrame::Welcome {
            handle,
            ice_servers: self.get_ice_servers(),
        };
        // rx is still alive here
        let _ = tx.send(welcome);

        self.inner.handles.insert(handle, tx);
        debug!("Handle {} connected", handle);
        (handle, rx)
    }

    /// Drop the handle's outbox and close every session it was bound to.
    pub fn disconnect(&self, handle: HandleId) {
        self.inner.handles.remove(&handle);
        let notices = self.inner.protocol.disconnect(handle);
        self.dispatch(notices);
        debug!("Handle {} disconnected", handle);
    }

    pub fn is_connected(&self, handle: HandleId) -> bool {
        self.inner.handles.contains_key(&handle)
    }

    /// Apply one request for `handle` and push whatever it produced to the other side.
    pub fn handle_request(&self, handle: HandleId, request: SignalRequest) -> SignalResponse {
        let SignalRequest { code, action, .. } = request;
        let outcome = self.inner.protocol.apply(handle, &code, action);
        let (response, deliveries) = outcome.into_response();
        self.dispatch(deliveries);
        response
    }

    pub fn send_frame(&self, handle: HandleId, frame: ServerFrame) {
        if let Some(outbox) = self.inner.handles.get(&handle) {
            if let Err(e) = outbox.send(frame) {
                error!("Failed to queue frame for {}: {}", handle, e);
            }
        } else {
            warn!("Attempted to push to disconnected handle {}", handle);
        }
    }

    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for Delivery { to, event } in deliveries {
            self.send_frame(to, ServerFrame::Event(event));
        }
    }

    pub fn sweep_expired(&self) -> usize {
        let notices = self.inner.protocol.sweep_expired();
        let count = notices.len();
        self.dispatch(notices);
        count
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `period` until aborted.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                service.sweep_expired();
            }
        })
    }

    pub fn session_count(&self) -> usize {
        self.inner.protocol.store().len()
    }

    pub fn handle_count(&self) -> usize {
        self.inner.handles.len()
    }

    pub fn snapshot(&self) -> Vec<SessionSummary> {
        self.inner.protocol.snapshot()
    }
}
