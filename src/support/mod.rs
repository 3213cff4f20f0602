pub mod errors;
pub mod shutdown;

pub use errors::*;
pub use shutdown::{listen_for_shutdown_signals, ShutdownCoordinator, ShutdownSignal};
