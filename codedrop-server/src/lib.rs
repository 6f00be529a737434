mod config;
mod diagnostics;
mod relay;
mod rendezvous;
mod session;
mod signaling;

pub use config::*;
pub use diagnostics::*;
pub use relay::*;
pub use rendezvous::*;
pub use session::*;
pub use signaling::*;
