//! Process lifecycle of the server: identity, socket, runtime files and
//! signal-driven shutdown.

use std::time::Duration;

mod errors;
mod files;
mod guard;
pub(crate) mod launch;
pub(crate) mod listener;
pub(crate) mod privileges;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::run_server;
pub use privileges::PrivilegeError;
pub use shutdown::ShutdownError;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
/// Upper bound on draining in-flight requests after a shutdown signal.
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
