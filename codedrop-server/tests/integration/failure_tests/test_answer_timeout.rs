use codedrop_core::SignalError;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test(start_paused = true)]
async fn test_answer_timeout() {
    init_tracing();

    let service = test_service();
    let mut config = fast_config();
    config.answer_timeout = Duration::from_secs(2);
    let initiator = local_coordinator(&service, config);

    let (transport, events, probe) = MockTransport::new(MockBehavior::Stalls);
    let result = initiator.run_initiator(transport, events, |_| {}).await;

    assert!(
        matches!(result, Err(SignalError::Timeout { .. })),
        "expected timeout"
    );
    // The abandoned code is released
    assert_eq!(service.session_count(), 0);
    assert!(probe.snapshot().await.closed);
}
