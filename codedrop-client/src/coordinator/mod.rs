mod backoff;
mod cancel_handle;
mod connection_coordinator;
mod coordinator_config;
mod established_link;
mod negotiation;

pub use cancel_handle::*;
pub use connection_coordinator::*;
pub use coordinator_config::*;
pub use established_link::*;
