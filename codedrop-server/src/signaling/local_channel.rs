use crate::SignalingService;
use async_trait::async_trait;
use codedrop_core::{
    Code, HandleId, ServerFrame, SignalAction, SignalEvent, SignalRequest, SignalResponse,
    SignalResult, SignalingChannel,
};
use tokio::sync::{Mutex, mpsc};

/// In-process [`SignalingChannel`] attached straight to a [`SignalingService`].
///
/// Behaves like a WebSocket client without the socket: it gets its own handle
/// and push events, and dropping it counts as a disconnect.
pub struct LocalChannel {
    service: SignalingService,
    handle: HandleId,
    frames: Mutex<mpsc::UnboundedReceiver<ServerFrame>>,
}

impl LocalChannel {
    pub fn connect(service: &SignalingService) -> Self {
        let (handle, frames) = service.connect();
        Self {
            service: service.clone(),
            handle,
            frames: Mutex::new(frames),
        }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }
}

#[async_trait]
impl SignalingChannel for LocalChannel {
    async fn request(&self, code: &Code, action: SignalAction) -> SignalResult<SignalResponse> {
        self.service
            .handle_request(self.handle, SignalRequest::new(code.clone(), action))
            .into_result()
    }

    async fn next_event(&self) -> Option<SignalEvent> {
        let mut frames = self.frames.lock().await;
        loop {
            match frames.recv().await? {
                ServerFrame::Event(event) => return Some(event),
                // replies are returned directly by `request`
                ServerFrame::Welcome { .. } | ServerFrame::Reply { .. } => continue,
            }
        }
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.service.disconnect(self.handle);
    }
}
