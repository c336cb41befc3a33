//! Application bootstrap orchestration.

use std::sync::Arc;

use axum::Router;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::warn;

use shinobi_config::{Config, DatabaseUrlError};

use crate::health::HealthReporter;
use crate::http::{self, AppState};
use crate::store::{Store, StoreError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the server configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out an already resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The database URL could not be interpreted.
    #[error("application cannot be loaded: {source}")]
    DatabaseUrl {
        /// Underlying parse error.
        #[source]
        source: DatabaseUrlError,
    },
    /// The store could not be opened or migrated.
    #[error("application cannot be loaded: {source}")]
    Store {
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
}

/// A bootstrapped application ready to be served.
#[derive(Debug)]
pub struct Service {
    config: Config,
    store: Arc<Store>,
    telemetry: TelemetryHandle,
}

impl Service {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Telemetry handle, mostly of interest to tests.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Shared application store.
    #[must_use]
    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Router serving the application.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState::new(Arc::clone(&self.store), &self.config.app_name);
        http::router(state, &self.config.api_prefix())
    }

    /// Closes the store once no handler holds a reference to it.
    pub fn shutdown(self) -> Result<(), StoreError> {
        match Arc::try_unwrap(self.store) {
            Ok(store) => store.close(),
            Err(_) => {
                warn!(
                    target: concat!(env!("CARGO_PKG_NAME"), "::store"),
                    "store still shared at shutdown; leaving connection to drop"
                );
                Ok(())
            }
        }
    }
}

/// Bootstraps the application using the supplied collaborators.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Service, BootstrapError> {
    reporter.bootstrap_starting();
    match bootstrap_inner(loader) {
        Ok(service) => {
            reporter.bootstrap_succeeded(service.config());
            Ok(service)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn bootstrap_inner(loader: &dyn ConfigLoader) -> Result<Service, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry = telemetry::initialise(config.log_settings())
        .map_err(|source| BootstrapError::Telemetry { source })?;
    let location = config
        .database_location()
        .map_err(|source| BootstrapError::DatabaseUrl { source })?;
    let store = Store::open(&location).map_err(|source| BootstrapError::Store { source })?;
    store
        .migrate()
        .map_err(|source| BootstrapError::Store { source })?;
    Ok(Service {
        config,
        store: Arc::new(store),
        telemetry,
    })
}
