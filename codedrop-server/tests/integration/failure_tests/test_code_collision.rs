use codedrop_core::{Code, SignalError, SignalingChannel};
use codedrop_server::LocalChannel;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test]
async fn test_taken_code_is_redrawn() {
    init_tracing();

    let service = test_service();
    let taken: Code = "111111".parse().expect("valid code");
    let fresh: Code = "222222".parse().expect("valid code");

    let holder = LocalChannel::connect(&service);
    holder
        .send_offer(&taken, "v=0 holder".into())
        .await
        .expect("Failed to occupy code");

    let initiator = local_coordinator(&service, fast_config());
    let (transport, events, _probe) = MockTransport::new(MockBehavior::Stalls);
    let mut codes = vec![taken.clone(), fresh.clone()].into_iter();

    let pending = initiator
        .publish_offer_with(transport, events, move || {
            codes.next().expect("ran out of codes")
        })
        .await
        .expect("Failed to publish offer");

    assert_eq!(pending.code(), &fresh);
    assert_eq!(service.session_count(), 2);
    // The holder's offer is untouched
    assert_eq!(
        holder.get_offer(&taken).await.expect("Offer missing"),
        "v=0 holder"
    );

    // Cleanup
    pending.abort().await;
    assert_eq!(service.session_count(), 1);
}

#[tokio::test]
async fn test_conflict_after_code_attempts_run_out() {
    init_tracing();

    let service = test_service();
    let taken: Code = "333333".parse().expect("valid code");

    let holder = LocalChannel::connect(&service);
    holder
        .send_offer(&taken, "v=0 holder".into())
        .await
        .expect("Failed to occupy code");

    let mut config = fast_config();
    config.code_attempts = 3;
    let initiator = local_coordinator(&service, config);

    let (transport, events, probe) = MockTransport::new(MockBehavior::Stalls);
    let mut drawn = 0;
    let result = initiator
        .publish_offer_with(transport, events, || {
            drawn += 1;
            taken.clone()
        })
        .await;

    match result {
        Err(SignalError::Conflict { code, .. }) => assert_eq!(code, taken),
        Err(other) => panic!("expected conflict, got {}", other),
        Ok(_) => panic!("occupied code must not be published"),
    }
    assert_eq!(drawn, 3);
    assert!(probe.snapshot().await.closed);
    assert_eq!(service.session_count(), 1);
}
