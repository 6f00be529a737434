use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use codedrop_core::{
    Code, HandleId, IceServerConfig, ServerFrame, SignalAction, SignalError, SignalEvent,
    SignalRequest, SignalResponse, SignalResult, SignalingChannel,
};
use dashmap::DashMap;
use futures::{SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

const WELCOME_TIMEOUT: Duration = Duration::from_secs(10);
const REPLY_TIMEOUT: Duration = Duration::from_secs(15);

type PendingReplies = Arc<DashMap<u64, oneshot::Sender<SignalResponse>>>;

/// [`SignalingChannel`] over the relay's `/ws` endpoint.
///
/// Requests are matched to replies by id; pushed events are queued for
/// [`next_event`](SignalingChannel::next_event).
pub struct WsSignalingChannel {
    handle: HandleId,
    ice_servers: Vec<IceServerConfig>,
    outgoing: mpsc::UnboundedSender<Message>,
    pending: PendingReplies,
    events: Mutex<mpsc::UnboundedReceiver<SignalEvent>>,
    next_id: AtomicU64,
    tasks: Vec<JoinHandle<()>>,
}

impl WsSignalingChannel {
    /// Connect to `ws://host:port/ws` and wait for the welcome frame.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to relay at {}", url))?;
        let (mut sink, mut stream) = ws.split();

        let (handle, ice_servers) = timeout(WELCOME_TIMEOUT, read_welcome(&mut stream))
            .await
            .context("timed out waiting for relay welcome")??;

        info!("Connected to relay {} as {}", url, handle);

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pending: PendingReplies = Arc::new(DashMap::new());

        let writer = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn({
            let pending = Arc::clone(&pending);
            async move {
                while let Some(Ok(msg)) = stream.next().await {
                    match msg {
                        Message::Text(text) => match serde_json::from_str::<ServerFrame>(&text) {
                            Ok(ServerFrame::Reply { id, response }) => {
                                match pending.remove(&id) {
                                    Some((_, tx)) => {
                                        let _ = tx.send(response);
                                    }
                                    None => warn!("Reply #{} matches no request", id),
                                }
                            }
                            Ok(ServerFrame::Event(event)) => {
                                if events_tx.send(event).is_err() {
                                    debug!("Event dropped, channel owner gone");
                                }
                            }
                            Ok(ServerFrame::Welcome { .. }) => {}
                            Err(e) => warn!("Unreadable frame from relay: {}", e),
                        },
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                info!("Relay connection closed");
                // dropping the senders fails every in-flight request
                pending.clear();
            }
        });

        Ok(Self {
            handle,
            ice_servers,
            outgoing,
            pending,
            events: Mutex::new(events_rx),
            next_id: AtomicU64::new(1),
            tasks: vec![writer, reader],
        })
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// ICE servers advertised by the relay.
    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }
}

#[async_trait]
impl SignalingChannel for WsSignalingChannel {
    async fn request(&self, code: &Code, action: SignalAction) -> SignalResult<SignalResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = action.name();
        let request = SignalRequest {
            id,
            code: code.clone(),
            action,
        };
        let json = serde_json::to_string(&request)
            .map_err(|e| SignalError::InvalidPayload(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        if self.outgoing.send(Message::Text(json.into())).is_err() {
            self.pending.remove(&id);
            return Err(SignalError::ChannelClosed);
        }
        debug!("{} #{} sent for code {}", name, id, code);

        match timeout(REPLY_TIMEOUT, rx).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(_)) => Err(SignalError::ChannelClosed),
            Err(_) => {
                self.pending.remove(&id);
                error!("No reply to {} #{} from relay", name, id);
                Err(SignalError::timeout(format!("relay reply to {}", name)))
            }
        }
    }

    async fn next_event(&self) -> Option<SignalEvent> {
        self.events.lock().await.recv().await
    }
}

async fn read_welcome<S>(stream: &mut S) -> Result<(HandleId, Vec<IceServerConfig>)>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        let msg = msg.context("relay connection failed before welcome")?;
        let Message::Text(text) = msg else { continue };
        match serde_json::from_str::<ServerFrame>(&text) {
            Ok(ServerFrame::Welcome {
                handle,
                ice_servers,
            }) => return Ok((handle, ice_servers)),
            Ok(other) => debug!("Frame before welcome: {:?}", other),
            Err(e) => warn!("Unreadable frame from relay: {}", e),
        }
    }
    bail!("relay closed the connection before welcome")
}

impl Drop for WsSignalingChannel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
