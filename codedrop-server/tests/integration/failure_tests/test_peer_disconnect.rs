use codedrop_core::{Missing, SignalError, SignalingChannel};
use codedrop_server::LocalChannel;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test]
async fn test_peer_disconnect() {
    init_tracing();

    let service = test_service();
    let initiator = local_coordinator(&service, fast_config());

    let (transport, events, probe) = MockTransport::new(MockBehavior::Connects);
    let pending = initiator
        .publish_offer(transport, events)
        .await
        .expect("Failed to publish offer");
    let code = pending.code().clone();

    // A responder binds and then vanishes
    let responder = LocalChannel::connect(&service);
    responder.wait_for_offer(&code).await.expect("Failed to bind responder");
    drop(responder);

    let result = pending.establish().await;
    match result {
        Err(err) => assert_eq!(err, SignalError::not_found(&code, Missing::Session)),
        Ok(_) => panic!("link must not come up without a peer"),
    }
    assert_eq!(service.session_count(), 0);
    assert!(probe.snapshot().await.closed);
}
