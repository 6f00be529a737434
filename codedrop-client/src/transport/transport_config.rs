use codedrop_core::IceServerConfig;

/// Конфигурация для WebRTC
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Capacity of the event channel handed to the coordinator.
    pub event_buffer: usize,
}

impl TransportConfig {
    /// Host candidates only. Enough for peers on the same machine or LAN.
    pub fn local() -> Self {
        Self {
            ice_servers: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_ice_servers(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            ice_servers,
            ..Self::default()
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
            event_buffer: 128,
        }
    }
}
