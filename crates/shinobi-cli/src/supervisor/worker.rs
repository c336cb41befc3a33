//! Launching and stopping worker processes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use shinobi_config::{Config, DEFAULT_HOST, DEVELOPMENT_HOST, RuntimePaths, ServerMode};

use crate::config::config_path_argument;
use crate::project::Project;

use super::SupervisorError;

const STOP_TIMEOUT: Duration = Duration::from_secs(10);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Host a development worker binds to.
///
/// The production wildcard default is narrowed to loopback; an explicitly
/// configured host is kept.
#[must_use]
pub(crate) fn development_host(configured: &str) -> &str {
    if configured == DEFAULT_HOST {
        DEVELOPMENT_HOST
    } else {
        configured
    }
}

/// Everything needed to start identical workers across reloads.
#[derive(Debug, Clone)]
pub(crate) struct WorkerLaunch {
    program: String,
    args: Vec<OsString>,
    cwd: PathBuf,
    address: String,
    paths: RuntimePaths,
}

impl WorkerLaunch {
    /// Derives the worker command line from the project and configuration.
    pub(crate) fn new(
        project: &Project,
        config: &Config,
        config_arguments: &[OsString],
    ) -> Result<Self, SupervisorError> {
        let mut worker_config = config.clone();
        worker_config.host = development_host(&config.host).to_owned();
        worker_config.mode = ServerMode::Development;
        let paths = RuntimePaths::from_config(&worker_config)?;

        let command = project.server_command();
        let (program, leading) = command
            .split_first()
            .ok_or(SupervisorError::EmptyServerCommand)?;
        let mut args: Vec<OsString> = leading.iter().map(OsString::from).collect();
        for (flag, value) in [
            ("--mode", worker_config.mode.to_string()),
            ("--host", worker_config.host.clone()),
            ("--port", worker_config.port.to_string()),
            ("--log-filter", worker_config.log_filter.clone()),
            ("--log-format", worker_config.log_format.to_string()),
        ] {
            args.push(OsString::from(flag));
            args.push(OsString::from(value));
        }
        args.push(OsString::from("--runtime-dir"));
        args.push(paths.runtime_dir().as_os_str().to_owned());
        if let Some(config_path) = config_path_argument(config_arguments) {
            args.push(OsString::from("--config-path"));
            args.push(config_path);
        }

        Ok(Self {
            program: program.clone(),
            args,
            cwd: project.root().to_path_buf(),
            address: worker_config.bind_address(),
            paths,
        })
    }

    /// `host:port` the worker listens on.
    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn health_path(&self) -> &Path {
        self.paths.health_path()
    }

    #[cfg(test)]
    pub(crate) fn args(&self) -> &[OsString] {
        &self.args
    }

    pub(crate) fn spawn(&self) -> Result<Worker, SupervisorError> {
        let started_at = SystemTime::now();
        let child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(Worker { child, started_at })
    }
}

/// A running worker process.
#[derive(Debug)]
pub(crate) struct Worker {
    child: Child,
    started_at: SystemTime,
}

impl Worker {
    pub(crate) const fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub(crate) fn try_wait(&mut self) -> Result<Option<ExitStatus>, SupervisorError> {
        self.child
            .try_wait()
            .map_err(|source| SupervisorError::Monitor { source })
    }

    /// Sends SIGTERM, then kills the worker if it outlives the stop timeout.
    pub(crate) fn terminate(mut self) -> Result<ExitStatus, SupervisorError> {
        if let Some(status) = self.try_wait()? {
            return Ok(status);
        }
        let pid = self.child.id();
        let raw = i32::try_from(pid).map_err(|_| SupervisorError::Signal {
            pid,
            source: Errno::EINVAL,
        })?;
        match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(source) => return Err(SupervisorError::Signal { pid, source }),
        }
        let deadline = Instant::now() + STOP_TIMEOUT;
        while Instant::now() < deadline {
            if let Some(status) = self.try_wait()? {
                return Ok(status);
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }
        self.child
            .kill()
            .map_err(|source| SupervisorError::Monitor { source })?;
        self.child
            .wait()
            .map_err(|source| SupervisorError::Monitor { source })
    }
}
