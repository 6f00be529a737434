mod delivery;
mod rendezvous_protocol;

pub use delivery::*;
pub use rendezvous_protocol::*;
