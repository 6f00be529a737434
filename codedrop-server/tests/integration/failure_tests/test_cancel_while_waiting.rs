use codedrop_core::{Code, SignalError};
use std::sync::Mutex;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting() {
    init_tracing();

    let service = test_service();
    let initiator = local_coordinator(&service, fast_config());
    let cancel = initiator.cancel_handle();

    let (transport, events, probe) = MockTransport::new(MockBehavior::Stalls);
    let shared: Mutex<Option<Code>> = Mutex::new(None);

    let (result, ()) = tokio::join!(
        initiator.run_initiator(transport, events, |code| {
            *shared.lock().expect("poisoned") = Some(code.clone());
        }),
        async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        }
    );

    assert!(matches!(result, Err(SignalError::Cancelled)));
    assert!(shared.lock().expect("poisoned").is_some());
    assert_eq!(service.session_count(), 0);
    assert!(probe.snapshot().await.closed);

    // A cancelled coordinator refuses new work
    let (transport, events, _probe) = MockTransport::new(MockBehavior::Stalls);
    assert!(matches!(
        initiator.publish_offer(transport, events).await,
        Err(SignalError::Cancelled)
    ));
}
