use codedrop_client::WsSignalingChannel;
use codedrop_core::{CloseReason, Code, SignalEvent, SignalingChannel};

use crate::integration::init_tracing;
use crate::utils::{SCENARIO_TIMEOUT, spawn_relay};

#[tokio::test]
async fn test_disconnect_notifies_peer() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let code: Code = "123123".parse().expect("valid code");

    let initiator = WsSignalingChannel::connect(&relay.ws_url())
        .await
        .expect("Failed to connect initiator");
    let responder = WsSignalingChannel::connect(&relay.ws_url())
        .await
        .expect("Failed to connect responder");
    assert_ne!(initiator.handle(), responder.handle());

    initiator
        .send_offer(&code, "v=0 offer".into())
        .await
        .expect("Failed to send offer");
    assert_eq!(
        responder.get_offer(&code).await.expect("Offer missing"),
        "v=0 offer"
    );
    responder
        .send_answer(&code, "v=0 answer".into())
        .await
        .expect("Failed to send answer");

    drop(initiator);

    let closed = tokio::time::timeout(SCENARIO_TIMEOUT, async {
        loop {
            match responder.next_event().await {
                Some(SignalEvent::ConnectionClosed { reason, .. }) => break Some(reason),
                Some(_) => continue,
                None => break None,
            }
        }
    })
    .await
    .expect("No close notice");
    assert_eq!(closed, Some(CloseReason::PeerDisconnected));
    assert_eq!(relay.service.session_count(), 0);

    // Cleanup
    drop(responder);
    relay.stop().await.expect("Relay failed");
}
