use codedrop_client::{ConnectionCoordinator, TransportConfig, WebRtcTransport, WsSignalingChannel};
use codedrop_core::{SignalingChannel, TransferPayload};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{SCENARIO_TIMEOUT, fast_config, spawn_relay};

async fn ws_coordinator(url: &str) -> ConnectionCoordinator {
    let channel: Arc<dyn SignalingChannel> = Arc::new(
        WsSignalingChannel::connect(url)
            .await
            .expect("Failed to connect to relay"),
    );
    ConnectionCoordinator::new(channel, fast_config())
}

#[tokio::test]
async fn test_transfer_over_data_channel() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let initiator = ws_coordinator(&relay.ws_url()).await;
    let responder = ws_coordinator(&relay.ws_url()).await;

    let (i_transport, i_events) = WebRtcTransport::new(TransportConfig::local())
        .await
        .expect("Failed to create initiator transport");
    let (r_transport, r_events) = WebRtcTransport::new(TransportConfig::local())
        .await
        .expect("Failed to create responder transport");

    // Spans several data channel chunks
    let content: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
    let file = TransferPayload::file("blob.bin", None, content);
    let text = TransferPayload::text("привет, peer");

    let scenario = async {
        let pending = initiator
            .publish_offer(i_transport, i_events)
            .await
            .expect("Failed to publish offer");
        let code = pending.code().clone();

        let (i_link, r_link) = tokio::join!(
            pending.establish(),
            responder.run_responder(code, r_transport, r_events)
        );
        let i_link = i_link.expect("Initiator failed");
        let mut r_link = r_link.expect("Responder failed");

        i_link.send(&text).await.expect("Failed to send text");
        i_link.send(&file).await.expect("Failed to send file");

        assert_eq!(r_link.recv().await.as_ref(), Some(&text));
        assert_eq!(r_link.recv().await.as_ref(), Some(&file));

        r_link.close().await.expect("Failed to close responder");
        i_link.close().await.expect("Failed to close initiator");
    };
    tokio::time::timeout(SCENARIO_TIMEOUT, scenario)
        .await
        .expect("Transfer timed out");

    assert_eq!(relay.service.session_count(), 0);

    // Cleanup
    drop(initiator);
    drop(responder);
    relay.stop().await.expect("Relay failed");
}
