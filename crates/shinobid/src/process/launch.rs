//! Launch sequencing for the server process.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use shinobi_config::RuntimePaths;

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::HealthReporter;
use crate::telemetry;

use super::errors::LaunchError;
use super::guard::{HealthState, ProcessGuard};
use super::listener;
use super::privileges::{self, IdentityControl, SystemIdentity};
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, SHUTDOWN_TIMEOUT};

const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

type ServerTask = JoinHandle<io::Result<()>>;

/// Process-level collaborators controlling identity and shutdown.
pub(crate) struct ProcessControl<I, S> {
    pub(crate) identity: I,
    pub(crate) shutdown: S,
}

/// Collaborators needed to build the application.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Everything required to launch the server.
pub(crate) struct LaunchPlan<L, I, S> {
    pub(crate) process: ProcessControl<I, S>,
    pub(crate) services: ServiceDeps<L>,
}

/// Runs the server with the production collaborators.
pub fn run_server() -> Result<(), LaunchError> {
    let shutdown = SystemShutdownSignal::install()?;
    let plan = LaunchPlan {
        process: ProcessControl {
            identity: SystemIdentity,
            shutdown,
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
    };
    run_server_with(plan)
}

/// Runs the server with injected collaborators.
pub(crate) fn run_server_with<L, I, S>(plan: LaunchPlan<L, I, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    I: IdentityControl,
    S: ShutdownSignal + 'static,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl { identity, shutdown } = process;
    let ServiceDeps { loader, reporter } = services;

    let config = loader.load()?;
    telemetry::initialise(config.log_settings())
        .map_err(|source| LaunchError::Telemetry { source })?;
    info!(
        target: PROCESS_TARGET,
        mode = %config.mode(),
        address = %config.bind_address(),
        "starting server"
    );
    privileges::enforce(config.mode(), config.run_as.as_deref(), &identity)?;
    let std_listener = listener::bind(&config.bind_address())?;
    let local_address = std_listener
        .local_addr()
        .map_err(|source| LaunchError::Bind {
            address: config.bind_address(),
            source,
        })?;

    let mut guard = ProcessGuard::new(RuntimePaths::from_config(&config)?);
    guard.write_pid(std::process::id())?;
    guard.write_health(HealthState::Starting)?;

    let service = bootstrap_with(
        &StaticConfigLoader::new(config.clone()),
        Arc::clone(&reporter),
    )?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| LaunchError::Runtime { source })?;
    let session = ServeSession {
        app: service.router(),
        address: local_address,
        guard: &guard,
        reporter: reporter.as_ref(),
    };
    let served = runtime.block_on(session.run(std_listener, shutdown));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    served?;
    reporter.server_stopped();

    service
        .shutdown()
        .map_err(|source| LaunchError::Store { source })?;
    drop(guard);
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

/// One serving period, from accepting connections to a drained server.
struct ServeSession<'a> {
    app: Router,
    address: SocketAddr,
    guard: &'a ProcessGuard,
    reporter: &'a dyn HealthReporter,
}

impl ServeSession<'_> {
    async fn run<S>(self, std_listener: std::net::TcpListener, shutdown: S) -> Result<(), LaunchError>
    where
        S: ShutdownSignal + 'static,
    {
        let tokio_listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|source| LaunchError::Serve { source })?;
        let (stop_sender, stop_receiver) = oneshot::channel::<()>();
        let app = self.app;
        let mut server: ServerTask = tokio::spawn(async move {
            axum::serve(tokio_listener, app)
                .with_graceful_shutdown(async move {
                    // A dropped sender also stops the server.
                    stop_receiver.await.unwrap_or_default();
                })
                .await
        });
        self.reporter.server_listening(self.address);
        self.guard.write_health(HealthState::Ready)?;

        await_shutdown(&mut server, shutdown).await?;
        self.guard.write_health(HealthState::Stopping)?;
        if stop_sender.send(()).is_err() {
            warn!(
                target: PROCESS_TARGET,
                "http server stopped before shutdown was requested"
            );
        }
        drain(server).await
    }
}

/// Waits for a shutdown request while watching the server task.
///
/// A server that stops on its own before shutdown is requested is an error;
/// the pending signal wait is abandoned with the runtime.
async fn await_shutdown<S>(server: &mut ServerTask, shutdown: S) -> Result<(), LaunchError>
where
    S: ShutdownSignal + 'static,
{
    let mut signal = tokio::task::spawn_blocking(move || shutdown.wait());
    tokio::select! {
        finished = &mut *server => Err(match finished {
            Ok(Ok(())) => LaunchError::ServerStopped,
            Ok(Err(source)) => LaunchError::Serve { source },
            Err(source) => LaunchError::ServerTask { source },
        }),
        waited = &mut signal => match waited {
            Ok(result) => result.map_err(LaunchError::from),
            Err(source) => Err(LaunchError::ShutdownTask { source }),
        },
    }
}

async fn drain(server: ServerTask) -> Result<(), LaunchError> {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(source))) => Err(LaunchError::Serve { source }),
        Ok(Err(source)) => Err(LaunchError::ServerTask { source }),
        Err(_) => {
            warn!(
                target: PROCESS_TARGET,
                timeout_ms = u64::try_from(SHUTDOWN_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
                "graceful shutdown timed out; abandoning open connections"
            );
            Ok(())
        }
    }
}
