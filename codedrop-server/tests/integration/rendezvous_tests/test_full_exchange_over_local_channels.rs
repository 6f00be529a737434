use codedrop_core::{Role, TransferPayload};

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test]
async fn test_full_exchange_over_local_channels() {
    init_tracing();

    let service = test_service();
    let initiator = local_coordinator(&service, fast_config());
    let responder = local_coordinator(&service, fast_config());

    let ((i_transport, i_events, i_probe), (r_transport, r_events, r_probe)) =
        MockTransport::pair(MockBehavior::Connects, MockBehavior::Connects);

    let pending = initiator
        .publish_offer(i_transport, i_events)
        .await
        .expect("Failed to publish offer");
    let code = pending.code().clone();
    assert_eq!(code.as_str().len(), 6);
    assert_eq!(service.session_count(), 1);

    let (i_link, r_link) = tokio::join!(
        pending.establish(),
        responder.run_responder(code.clone(), r_transport, r_events)
    );
    let i_link = i_link.expect("Initiator failed");
    let mut r_link = r_link.expect("Responder failed");
    assert_eq!(i_link.role(), Role::Initiator);
    assert_eq!(r_link.role(), Role::Responder);
    assert_eq!(r_link.code(), &code);

    // Descriptions crossed over unchanged
    let i_state = i_probe.snapshot().await;
    let r_state = r_probe.snapshot().await;
    assert_eq!(r_state.remote_offer, i_state.local_description);
    assert_eq!(i_state.remote_answer, r_state.local_description);
    assert!(!i_state.remote_candidates.is_empty());
    assert!(!r_state.remote_candidates.is_empty());

    let payload = TransferPayload::text("hello from the initiator");
    i_link.send(&payload).await.expect("Send failed");
    assert_eq!(r_link.recv().await, Some(payload));

    // Cleanup
    r_link.close().await.expect("Failed to close responder");
    let mut i_link = i_link;
    assert_eq!(i_link.recv().await, None);
    i_link.close().await.expect("Failed to close initiator");

    assert_eq!(service.session_count(), 0);
    assert!(i_probe.snapshot().await.closed);
    assert!(r_probe.snapshot().await.closed);
}
