use codedrop_client::{ConnectionCoordinator, CoordinatorConfig};
use codedrop_core::SignalingChannel;
use codedrop_server::{LocalChannel, SignalingService};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_SESSION_MAX_AGE: Duration = Duration::from_secs(60);

/// Bound for whole test scenarios on real time.
pub const SCENARIO_TIMEOUT: Duration = Duration::from_secs(20);

pub fn test_service() -> SignalingService {
    SignalingService::new(TEST_SESSION_MAX_AGE, Vec::new())
}

/// Short waits and fast polling.
pub fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        offer_timeout: Duration::from_secs(5),
        answer_timeout: Duration::from_secs(5),
        candidate_window: Duration::from_secs(5),
        poll_interval: Duration::from_millis(50),
        max_poll_interval: Duration::from_millis(400),
        code_attempts: 5,
    }
}

/// Coordinator talking to `service` through its own in-process handle.
pub fn local_coordinator(service: &SignalingService, config: CoordinatorConfig) -> ConnectionCoordinator {
    let channel: Arc<dyn SignalingChannel> = Arc::new(LocalChannel::connect(service));
    ConnectionCoordinator::new(channel, config)
}
