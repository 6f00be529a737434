use codedrop_core::TransferPayload;
use std::fmt;

/// Состояние прямого соединения между пирами.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    /// The data channel is open and can carry payloads.
    Connected,
    Closed,
    Failed,
}

impl LinkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// События, которые транспорт отдает координатору.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A local ICE candidate (JSON `RTCIceCandidateInit`) to relay to the peer.
    CandidateGenerated(String),

    StateChanged(LinkState),

    DataReceived(TransferPayload),
}
