use codedrop_client::{ConnectionCoordinator, WsSignalingChannel};
use codedrop_core::{SignalingChannel, TransferPayload};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, SCENARIO_TIMEOUT, fast_config, spawn_relay};

async fn ws_coordinator(url: &str) -> ConnectionCoordinator {
    let channel = WsSignalingChannel::connect(url)
        .await
        .expect("Failed to connect to relay");
    assert!(channel.ice_servers().is_empty());
    let channel: Arc<dyn SignalingChannel> = Arc::new(channel);
    ConnectionCoordinator::new(channel, fast_config())
}

#[tokio::test]
async fn test_rendezvous_over_websocket() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let initiator = ws_coordinator(&relay.ws_url()).await;
    let responder = ws_coordinator(&relay.ws_url()).await;

    let ((i_transport, i_events, _i_probe), (r_transport, r_events, _r_probe)) =
        MockTransport::pair(MockBehavior::Connects, MockBehavior::Connects);

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

        let payload = TransferPayload::file(
            "notes.txt",
            Some("text/plain".into()),
            b"relay round trip".to_vec(),
        );
        i_link.send(&payload).await.expect("Send failed");
        assert_eq!(r_link.recv().await, Some(payload));

        r_link.close().await.expect("Failed to close responder");
        i_link.close().await.expect("Failed to close initiator");
    };
    tokio::time::timeout(SCENARIO_TIMEOUT, scenario)
        .await
        .expect("Scenario timed out");

    assert_eq!(relay.service.session_count(), 0);
    assert_eq!(relay.service.handle_count(), 2);

    // Cleanup
    drop(initiator);
    drop(responder);
    relay.stop().await.expect("Relay failed");
}
