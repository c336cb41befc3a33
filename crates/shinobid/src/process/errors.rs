//! Error surface for launching and supervising the server process.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTimeError;

use ortho_config::OrthoError;
use thiserror::Error;

use shinobi_config::RuntimePathsError;

use crate::bootstrap::BootstrapError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;

use super::privileges::PrivilegeError;
use super::shutdown::ShutdownError;

/// Errors surfaced while launching or running the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Logging could not be configured.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Switching or checking the process identity failed.
    #[error(transparent)]
    Privileges(#[from] PrivilegeError),
    /// Another process already listens on the address.
    #[error("address {address} is already in use")]
    AddressInUse {
        /// `host:port` that could not be bound.
        address: String,
    },
    /// Binding the listener failed for another reason.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// `host:port` that could not be bound.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The runtime directory could not be created.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the PID file failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the health snapshot failed.
    #[error("failed to write health snapshot '{path}': {source}")]
    HealthWrite {
        /// Health file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising the health snapshot failed.
    #[error("failed to serialise health snapshot: {source}")]
    HealthSerialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// Obtaining the current timestamp failed.
    #[error("failed to read system time: {source}")]
    Clock {
        /// Underlying system time error.
        #[source]
        source: SystemTimeError,
    },
    /// Health updates were attempted before writing the PID file.
    #[error("pid must be written before updating health state")]
    MissingPid,
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// Bootstrapping the application failed.
    #[error("{source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// The async runtime could not be built.
    #[error("failed to start async runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The HTTP server stopped with an error.
    #[error("http server failed: {source}")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The HTTP server returned before shutdown was requested.
    #[error("http server stopped before shutdown was requested")]
    ServerStopped,
    /// The shutdown listener panicked or was cancelled.
    #[error("shutdown listener failed: {source}")]
    ShutdownTask {
        /// Underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },
    /// The HTTP server task panicked or was cancelled.
    #[error("http server task failed: {source}")]
    ServerTask {
        /// Underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },
    /// Closing the store failed.
    #[error("failed to close store: {source}")]
    Store {
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
}

impl From<Arc<OrthoError>> for LaunchError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<RuntimePathsError> for LaunchError {
    fn from(source: RuntimePathsError) -> Self {
        match source {
            RuntimePathsError::RuntimeDirectory { path, source } => {
                Self::RuntimeDirectory { path, source }
            }
        }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}
