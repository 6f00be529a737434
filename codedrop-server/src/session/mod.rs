mod session_record;
mod session_store;

pub use session_record::*;
pub use session_store::*;
