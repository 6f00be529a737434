use codedrop_core::{Code, SignalError};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test(start_paused = true)]
async fn test_unknown_code_times_out() {
    init_tracing();

    let service = test_service();
    let mut config = fast_config();
    config.offer_timeout = Duration::from_secs(3);
    let responder = local_coordinator(&service, config);

    let code: Code = "000001".parse().expect("valid code");
    let (transport, events, probe) = MockTransport::new(MockBehavior::Connects);
    let result = responder.run_responder(code, transport, events).await;

    assert!(matches!(result, Err(SignalError::Timeout { .. })));
    // The waiting record is released with the responder
    assert_eq!(service.session_count(), 0);
    let state = probe.snapshot().await;
    assert!(state.closed);
    assert!(state.local_description.is_none());
}
