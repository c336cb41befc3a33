//! Development supervisor behind `shinobi run`.
//!
//! The supervisor starts one worker, polls the watched sources, and restarts
//! the worker with identical arguments whenever a watched file changes. It
//! is a single-threaded polling loop over the worker status, its health
//! snapshot, the source snapshot, and a shutdown flag raised by signals.

mod readiness;
mod watch;
mod worker;

use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use signal_hook::consts::{SIGINT, SIGTERM};
use thiserror::Error;

use shinobi_config::RuntimePathsError;

use crate::manifest::{Manifest, ManifestError};
use crate::output::{CommandOutput, OutputError};
use crate::project::{Project, WatchSettings};
use crate::receipt::{self, ReceiptError};
use crate::runner::Completion;

use watch::SourceSnapshot;
pub(crate) use worker::WorkerLaunch;
use worker::Worker;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Errors surfaced by `shinobi run`.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No current install receipt exists.
    #[error("dependencies are not installed; run `shinobi install`")]
    NotInstalled,
    /// The runtime manifest could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// The install receipt could not be read.
    #[error(transparent)]
    Receipt(#[from] ReceiptError),
    /// The runtime directory could not be prepared.
    #[error(transparent)]
    Paths(#[from] RuntimePathsError),
    /// The configured server command is empty.
    #[error("the server command is empty")]
    EmptyServerCommand,
    /// The worker could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// Worker program.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The first worker failed before any reload.
    #[error("shinobid exited with {completion} before serving; see the output above")]
    InitialWorkerFailed {
        /// How the worker finished.
        completion: Completion,
    },
    /// Waiting on the worker failed.
    #[error("failed to monitor the worker: {source}")]
    Monitor {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Signalling the worker failed.
    #[error("failed to signal worker pid {pid}: {source}")]
    Signal {
        /// Worker pid.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Shutdown signal handlers could not be installed.
    #[error("failed to install signal handlers: {source}")]
    SignalHandlers {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The health snapshot could not be read.
    #[error("failed to read health snapshot {path:?}: {source}")]
    ReadHealth {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The health snapshot is not valid JSON.
    #[error("failed to parse health snapshot {path:?}: {source}")]
    ParseHealth {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A watched directory could not be read.
    #[error("failed to watch {path:?}: {source}")]
    Watch {
        /// Directory being walked.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Progress could not be reported.
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Fails unless an install receipt matches the current manifests.
pub(crate) fn ensure_installed(project: &Project) -> Result<(), SupervisorError> {
    let Some(receipt) = receipt::read(project.root())? else {
        return Err(SupervisorError::NotInstalled);
    };
    let runtime = Manifest::runtime(project.root())?;
    let development = Manifest::development(&project.dev_packages());
    if receipt.is_current(&runtime, &development) {
        Ok(())
    } else {
        Err(SupervisorError::NotInstalled)
    }
}

/// Raises the returned flag on SIGINT or SIGTERM.
pub(crate) fn install_stop_flag() -> Result<Arc<AtomicBool>, SupervisorError> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .map_err(|source| SupervisorError::SignalHandlers { source })?;
    }
    Ok(flag)
}

/// Mutable state of one supervision session.
#[derive(Debug, Default)]
struct Session {
    worker: Option<Worker>,
    reloaded: bool,
    announced: bool,
}

/// Supervises development workers until stopped.
#[derive(Debug)]
pub(crate) struct Supervisor {
    root: PathBuf,
    watch: WatchSettings,
    launch: WorkerLaunch,
    stop: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl Supervisor {
    pub(crate) fn new(project: &Project, launch: WorkerLaunch, stop: Arc<AtomicBool>) -> Self {
        Self {
            root: project.root().to_path_buf(),
            watch: project.watch().clone(),
            launch,
            stop,
            poll_interval: POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    pub(crate) const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Runs until the stop flag is raised.
    ///
    /// A failure of the first worker ends the session with an error; after
    /// a reload, failures are reported and the next change is awaited.
    pub(crate) fn run<W: Write, E: Write>(
        &self,
        output: &mut CommandOutput<W, E>,
    ) -> Result<(), SupervisorError> {
        let mut snapshot = SourceSnapshot::capture(&self.root, &self.watch)?;
        let mut session = Session {
            worker: Some(self.start(output)?),
            ..Session::default()
        };
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return stop_session(&mut session, output);
            }
            if self.poll_worker(&mut session, output)?.is_break() {
                return Ok(());
            }
            thread::sleep(self.poll_interval);
            let current = SourceSnapshot::capture(&self.root, &self.watch)?;
            if let Some(changed) = snapshot.first_difference(&current) {
                snapshot = current;
                let shown = changed.strip_prefix(&self.root).unwrap_or(&changed);
                output.stdout_line(format_args!("change detected in {}; reloading", shown.display()))?;
                if let Some(worker) = session.worker.take() {
                    worker.terminate()?;
                }
                session.worker = Some(self.start(output)?);
                session.reloaded = true;
                session.announced = false;
            }
        }
    }

    fn start<W: Write, E: Write>(
        &self,
        output: &mut CommandOutput<W, E>,
    ) -> Result<Worker, SupervisorError> {
        output.stdout_line(format_args!(
            "starting shinobid in development mode on http://{}",
            self.launch.address()
        ))?;
        self.launch.spawn()
    }

    fn poll_worker<W: Write, E: Write>(
        &self,
        session: &mut Session,
        output: &mut CommandOutput<W, E>,
    ) -> Result<ControlFlow<()>, SupervisorError> {
        let Some(worker) = session.worker.as_mut() else {
            return Ok(ControlFlow::Continue(()));
        };
        if let Some(status) = worker.try_wait()? {
            session.worker = None;
            let completion = Completion::from(status);
            if self.stop.load(Ordering::SeqCst) {
                return Ok(ControlFlow::Break(()));
            }
            if !session.reloaded {
                return if completion.succeeded() {
                    output.stdout_line(format_args!("shinobid exited"))?;
                    Ok(ControlFlow::Break(()))
                } else {
                    Err(SupervisorError::InitialWorkerFailed { completion })
                };
            }
            output.stderr_line(format_args!(
                "shinobid exited with {completion}; waiting for changes"
            ))?;
            return Ok(ControlFlow::Continue(()));
        }
        if !session.announced && readiness::is_ready(self.launch.health_path(), worker.started_at())? {
            session.announced = true;
            output.stdout_line(format_args!(
                "shinobid ready on http://{}",
                self.launch.address()
            ))?;
        }
        Ok(ControlFlow::Continue(()))
    }
}

fn stop_session<W: Write, E: Write>(
    session: &mut Session,
    output: &mut CommandOutput<W, E>,
) -> Result<(), SupervisorError> {
    if let Some(worker) = session.worker.take() {
        output.stdout_line(format_args!("stopping shinobid"))?;
        worker.terminate()?;
    }
    Ok(())
}
