pub use codedrop_core::{Code, SignalError, SignalResult, SignalingChannel, TransferPayload};

pub mod model {
    pub use codedrop_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use codedrop_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use codedrop_client::*;
}
