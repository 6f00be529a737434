use codedrop_core::{Code, SignalError, SignalingChannel};
use codedrop_server::LocalChannel;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test]
async fn test_second_responder_conflicts() {
    init_tracing();

    let service = test_service();
    let code: Code = "777777".parse().expect("valid code");

    let first = LocalChannel::connect(&service);
    first.wait_for_offer(&code).await.expect("First responder rejected");

    let second = local_coordinator(&service, fast_config());
    let (transport, events, probe) = MockTransport::new(MockBehavior::Connects);
    let result = second.run_responder(code.clone(), transport, events).await;

    match result {
        Err(SignalError::Conflict { code: conflicted, .. }) => assert_eq!(conflicted, code),
        Err(other) => panic!("expected conflict, got {}", other),
        Ok(_) => panic!("second responder must not join"),
    }
    assert!(probe.snapshot().await.closed);

    // The first responder still holds the code
    assert_eq!(service.session_count(), 1);
    drop(first);
    assert_eq!(service.session_count(), 0);
}
