use codedrop_core::SignalError;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test]
async fn test_transport_failure() {
    init_tracing();

    let service = test_service();
    let initiator = local_coordinator(&service, fast_config());
    let responder = local_coordinator(&service, fast_config());

    let ((i_transport, i_events, _i_probe), (r_transport, r_events, r_probe)) =
        MockTransport::pair(MockBehavior::Connects, MockBehavior::Fails);

    let pending = initiator
        .publish_offer(i_transport, i_events)
        .await
        .expect("Failed to publish offer");
    let code = pending.code().clone();

    let (i_result, r_result) = tokio::join!(
        pending.establish(),
        responder.run_responder(code, r_transport, r_events)
    );

    assert!(
        matches!(r_result, Err(SignalError::TransportFailure(_))),
        "responder should report the failed link"
    );
    assert!(r_probe.snapshot().await.closed);

    // The initiator either failed too or sees its link close right away
    if let Ok(mut link) = i_result {
        assert_eq!(link.recv().await, None);
        link.close().await.expect("Failed to close initiator");
    }
    assert_eq!(service.session_count(), 0);
}
