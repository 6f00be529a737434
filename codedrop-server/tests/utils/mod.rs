pub mod relay_harness;
pub mod signal_helpers;

pub use mock_transport::*;
pub use relay_harness::*;
pub use signal_helpers::*;
