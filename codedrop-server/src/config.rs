use codedrop_core::IceServerConfig;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:3001";
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(300);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Настройки relay-сервера.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Unresolved or abandoned sessions older than this are removed.
    pub session_max_age: Duration,
    pub sweep_interval: Duration,
    /// Handed to every client in the welcome frame.
    pub ice_servers: Vec<IceServerConfig>,
}

impl RelayConfig {
    pub fn default_ice_servers() -> Vec<IceServerConfig> {
        [
            "stun:stun.l.google.com:19302",
            "stun:stun1.l.google.com:19302",
            "stun:stun2.l.google.com:19302",
        ]
        .into_iter()
        .map(IceServerConfig::stun)
        .collect()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3001)),
            session_max_age: DEFAULT_SESSION_MAX_AGE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            ice_servers: Self::default_ice_servers(),
        }
    }
}
