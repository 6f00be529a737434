use std::time::Duration;

/// Bounded waits and polling cadence of a [`ConnectionCoordinator`](crate::ConnectionCoordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Responder: how long to wait for the offer behind a code.
    pub offer_timeout: Duration,
    /// Initiator: how long to wait for a responder to answer.
    pub answer_timeout: Duration,
    /// Both: how long candidate exchange may take before the link is up.
    pub candidate_window: Duration,
    pub poll_interval: Duration,
    /// Upper bound of the exponential poll backoff.
    pub max_poll_interval: Duration,
    /// Fresh codes to try when `send-offer` hits an occupied code.
    pub code_attempts: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            offer_timeout: Duration::from_secs(120),
            answer_timeout: Duration::from_secs(120),
            candidate_window: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            max_poll_interval: Duration::from_secs(4),
            code_attempts: 5,
        }
    }
}
