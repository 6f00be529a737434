mod peer_transport;
mod transport_config;
mod transport_event;
mod webrtc_transport;
mod wire_chunk;

pub use peer_transport::*;
pub use transport_config::*;
pub use transport_event::*;
pub use webrtc_transport::*;
pub use wire_chunk::MAX_PAYLOAD_SIZE;
