use crate::transport::wire_chunk::{Reassembler, encode_chunks};
use crate::transport::{LinkState, PeerTransport, TransportConfig, TransportEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use codedrop_core::TransferPayload;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

const DATA_CHANNEL_LABEL: &str = "data";

/// [`PeerTransport`] over a webrtc-rs peer connection with one ordered data channel.
pub struct WebRtcTransport {
    peer_connection: Arc<RTCPeerConnection>,
    /// Created locally on the offering side, accepted from the peer on the answering side.
    data_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
    event_tx: mpsc::Sender<TransportEvent>,
}

impl WebRtcTransport {
    /// Build the peer connection. Events are delivered on the returned receiver.
    pub async fn new(config: TransportConfig) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect();

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("failed to create peer connection")?,
        );

        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let data_channel = Arc::new(Mutex::new(None));

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    debug!("Peer connection state changed: {:?}", s);
                    if let Some(state) = link_state(s) {
                        let _ = tx.send(TransportEvent::StateChanged(state)).await;
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(json_candidate) = candidate.to_json() else {
                    return;
                };
                let Ok(str_candidate) = serde_json::to_string(&json_candidate) else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(str_candidate))
                    .await;
            })
        }));

        let dc_tx = event_tx.clone();
        let dc_slot = Arc::clone(&data_channel);
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let slot = Arc::clone(&dc_slot);
            Box::pin(async move {
                debug!("Remote data channel '{}' announced", dc.label());
                attach_data_channel(&slot, dc, tx).await;
            })
        }));

        Ok((
            Self {
                peer_connection,
                data_channel,
                event_tx,
            },
            event_rx,
        ))
    }
}

/// `None` for states that need no reaction.
fn link_state(state: RTCPeerConnectionState) -> Option<LinkState> {
    match state {
        // disconnected can recover
        RTCPeerConnectionState::Connecting | RTCPeerConnectionState::Disconnected => {
            Some(LinkState::Connecting)
        }
        RTCPeerConnectionState::Failed => Some(LinkState::Failed),
        RTCPeerConnectionState::Closed => Some(LinkState::Closed),
        // Connected is reported once the data channel opens
        _ => None,
    }
}

/// Wire open/message callbacks and remember the channel for `send`.
async fn attach_data_channel(
    slot: &Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
    dc: Arc<RTCDataChannel>,
    tx: mpsc::Sender<TransportEvent>,
) {
    let tx_open = tx.clone();
    let label = dc.label().to_owned();
    dc.on_open(Box::new(move || {
        Box::pin(async move {
            info!("DataChannel '{}' open", label);
            let _ = tx_open
                .send(TransportEvent::StateChanged(LinkState::Connected))
                .await;
        })
    }));

    let tx_close = tx.clone();
    dc.on_close(Box::new(move || {
        let tx = tx_close.clone();
        Box::pin(async move {
            debug!("DataChannel closed");
            let _ = tx.send(TransportEvent::StateChanged(LinkState::Closed)).await;
        })
    }));

    let reassembler = Arc::new(Mutex::new(Reassembler::default()));
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx.clone();
        let reassembler = Arc::clone(&reassembler);
        Box::pin(async move {
            let decoded = reassembler.lock().await.push(&msg.data);
            match decoded {
                Ok(Some(payload)) => {
                    debug!("Received {} payload", payload.kind());
                    let _ = tx.send(TransportEvent::DataReceived(payload)).await;
                }
                Ok(None) => {}
                Err(e) => warn!("Dropping data channel message: {:#}", e),
            }
        })
    }));

    *slot.lock().await = Some(dc);
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_local_offer(&self) -> Result<String> {
        let dc = self
            .peer_connection
            .create_data_channel(DATA_CHANNEL_LABEL, None)
            .await
            .context("failed to create data channel")?;
        attach_data_channel(&self.data_channel, dc, self.event_tx.clone()).await;

        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("failed to create offer")?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .context("failed to set local description")?;

        Ok(offer.sdp)
    }

    async fn create_local_answer(&self, remote_offer: String) -> Result<String> {
        let desc = RTCSessionDescription::offer(remote_offer).context("malformed offer")?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .context("failed to apply remote offer")?;

        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("failed to create answer")?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .context("failed to set local description")?;

        Ok(answer.sdp)
    }

    async fn apply_remote_answer(&self, answer: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(answer).context("malformed answer")?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .context("failed to apply remote answer")?;
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: String) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(&candidate).context("failed to parse ICE candidate JSON")?;
        self.peer_connection
            .add_ice_candidate(candidate)
            .await
            .context("failed to add ICE candidate")?;
        Ok(())
    }

    async fn send(&self, payload: &TransferPayload) -> Result<()> {
        let dc = self
            .data_channel
            .lock()
            .await
            .clone()
            .context("data channel not available")?;

        for frame in encode_chunks(payload)? {
            dc.send(&Bytes::from(frame))
                .await
                .context("failed to send on data channel")?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .context("failed to close peer connection")?;
        Ok(())
    }
}
