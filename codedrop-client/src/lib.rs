mod coordinator;
mod signaling;
mod transport;

pub use coordinator::*;
pub use signaling::*;
pub use transport::*;
