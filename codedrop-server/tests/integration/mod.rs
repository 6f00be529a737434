pub mod failure_tests;
pub mod rendezvous_tests;
pub mod webrtc_tests;
pub mod websocket_tests;

use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
