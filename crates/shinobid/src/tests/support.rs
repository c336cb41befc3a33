//! Test doubles shared by the bootstrap and process suites.

use std::ffi::OsString;
use std::net::{Ipv4Addr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use shinobi_config::{Config, LogFormat, ServerMode};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;
use crate::process::PrivilegeError;
use crate::process::privileges::IdentityControl;
use crate::process::shutdown::{ShutdownError, ShutdownSignal};

/// Lifecycle events captured by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ServerListening,
    ServerStopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn server_listening(&self, _address: std::net::SocketAddr) {
        self.record(HealthEvent::ServerListening);
    }

    fn server_stopped(&self) {
        self.record(HealthEvent::ServerStopped);
    }
}

/// Loader for a development server on a free loopback port with an
/// in-memory store and a private runtime directory.
///
/// Clones share the runtime directory, so a test can keep one while the
/// server consumes the other.
#[derive(Clone)]
pub struct TestConfigLoader {
    runtime_dir: Arc<TempDir>,
    port: u16,
    database_url: String,
    log_filter: String,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self {
            runtime_dir: Arc::new(TempDir::new().expect("runtime directory")),
            port: free_port(),
            database_url: "sqlite::memory:".to_owned(),
            log_filter: "info".to_owned(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database_url(mut self, url: &str) -> Self {
        url.clone_into(&mut self.database_url);
        self
    }

    pub fn with_log_filter(mut self, filter: &str) -> Self {
        filter.clone_into(&mut self.log_filter);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn runtime_dir(&self) -> &Path {
        self.runtime_dir.path()
    }

    pub fn pid_path(&self) -> PathBuf {
        self.runtime_dir()
            .join(format!("shinobid-{}.pid", self.port))
    }

    pub fn health_path(&self) -> PathBuf {
        self.runtime_dir()
            .join(format!("shinobid-{}.health", self.port))
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            host: Ipv4Addr::LOCALHOST.to_string(),
            port: self.port,
            mode: ServerMode::Development,
            database_url: self.database_url.clone(),
            log_filter: self.log_filter.clone(),
            runtime_dir: Some(self.runtime_dir.path().to_path_buf()),
            log_format: LogFormat::Compact,
            ..Config::default()
        })
    }
}

/// Loader that fails on an unknown server mode.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("shinobid"),
            OsString::from("--mode"),
            OsString::from("staging"),
        ])
    }
}

/// Shutdown signal fired through a channel.
pub struct ChannelShutdown {
    receiver: Mutex<Receiver<()>>,
}

impl ChannelShutdown {
    pub fn new() -> (Sender<()>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver: Mutex::new(receiver),
            },
        )
    }
}

impl ShutdownSignal for ChannelShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        let receiver = self.receiver.lock().map_err(|_| ShutdownError::Poisoned)?;
        // A dropped sender counts as a shutdown request.
        receiver.recv().unwrap_or_default();
        Ok(())
    }
}

/// Identity that is never root.
#[derive(Debug, Default)]
pub struct UnprivilegedIdentity;

impl IdentityControl for UnprivilegedIdentity {
    fn is_root(&self) -> bool {
        false
    }

    fn switch_to(&self, user: &str) -> Result<(), PrivilegeError> {
        panic!("unexpected identity switch to {user}");
    }
}

/// Reserves and releases a loopback port.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind ephemeral port");
    listener.local_addr().expect("listener address").port()
}
