//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use shinobi_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer notified as the server moves through its lifecycle.
pub trait HealthReporter: Send + Sync {
    /// Invoked before the application is bootstrapped.
    fn bootstrap_starting(&self);

    /// Invoked once the store is migrated and the application can serve.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the HTTP server accepts connections.
    fn server_listening(&self, address: SocketAddr);

    /// Invoked after the HTTP server has drained.
    fn server_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn server_listening(&self, address: SocketAddr) {
        (**self).server_listening(address);
    }

    fn server_stopped(&self) {
        (**self).server_stopped();
    }
}

/// Reporter that records lifecycle events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting application bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            mode = %config.mode(),
            database = %config.database_url,
            api_prefix = %config.api_prefix(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "application bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "application bootstrap failed"
        );
    }

    fn server_listening(&self, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_listening",
            address = %address,
            "server listening"
        );
    }

    fn server_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            "server stopped"
        );
    }
}
