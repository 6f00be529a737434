pub mod model;

mod channel;

pub use channel::SignalingChannel;
pub use model::*;
