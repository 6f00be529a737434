use codedrop_core::{Code, Role, SignalEvent, SignalingChannel};
use codedrop_server::LocalChannel;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{MockBehavior, MockTransport, fast_config, local_coordinator, test_service};

#[tokio::test]
async fn test_responder_waits_for_late_offer() {
    init_tracing();

    let service = test_service();
    let code: Code = "314159".parse().expect("valid code");
    let responder = local_coordinator(&service, fast_config());
    let initiator = LocalChannel::connect(&service);

    let (transport, events, probe) = MockTransport::new(MockBehavior::Connects);

    let late_initiator = async {
        // Let the responder subscribe first
        tokio::time::sleep(Duration::from_millis(100)).await;
        initiator
            .send_offer(&code, "v=0 late-offer".into())
            .await
            .expect("Failed to send offer");

        let answer = loop {
            match initiator.next_event().await.expect("Initiator channel closed") {
                SignalEvent::AnswerReceived { answer, .. } => break answer,
                other => tracing::debug!("initiator saw {:?}", other),
            }
        };
        initiator
            .send_ice_candidate(&code, "candidate:late-1".into(), Role::Initiator)
            .await
            .expect("Failed to send candidate");
        answer
    };

    let (link, answer) = tokio::join!(
        responder.run_responder(code.clone(), transport, events),
        late_initiator
    );
    let link = link.expect("Responder failed");

    let state = probe.snapshot().await;
    assert_eq!(state.remote_offer.as_deref(), Some("v=0 late-offer"));
    assert_eq!(state.local_description, Some(answer));
    assert_eq!(state.remote_candidates, vec!["candidate:late-1".to_string()]);

    // Cleanup
    link.close().await.expect("Failed to close link");
    assert_eq!(service.session_count(), 0);
}
