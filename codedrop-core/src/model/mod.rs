mod code;
mod error;
mod handle;
mod payload;
mod role;
mod signaling;

pub use code::{CODE_LEN, Code};
pub use error::{ErrorKind, Missing, SignalError, SignalResult};
pub use handle::HandleId;
pub use payload::TransferPayload;
pub use role::Role;
pub use signaling::{
    CloseReason, IceServerConfig, ServerFrame, SignalAction, SignalEvent, SignalRequest,
    SignalResponse,
};
