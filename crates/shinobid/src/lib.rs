//! The Shinobi registry server.
//!
//! `shinobid` hosts a single fixed application: a JSON API over characters
//! and their jutsus, persisted in SQLite. The crate owns the launch
//! sequence around it. Configuration is loaded through [`shinobi_config`],
//! production servers drop root privileges, and the listener is bound before
//! the application is bootstrapped so a busy port fails fast. While the server
//! runs it advertises itself through pid and health files in the runtime
//! directory; a termination signal drains in-flight requests, closes the
//! store and removes those files.
//!
//! Lifecycle events flow through [`HealthReporter`] so operators get
//! structured telemetry for each stage.

mod bootstrap;
pub mod domain;
mod health;
pub mod http;
mod process;
pub mod store;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Service, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, PrivilegeError, ShutdownError, run_server};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
