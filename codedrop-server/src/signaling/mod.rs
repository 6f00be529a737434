mod local_channel;
mod signaling_service;
mod ws_handler;

pub use local_channel::*;
pub use signaling_service::*;
pub use ws_handler::*;
