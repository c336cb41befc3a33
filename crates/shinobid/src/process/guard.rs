//! Pid and health files that advertise a running server.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{info, warn};

use shinobi_config::RuntimePaths;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::files::atomic_write;

/// Owns the runtime files and removes them when dropped.
#[derive(Debug)]
pub(super) struct ProcessGuard {
    paths: RuntimePaths,
    pid: Option<u32>,
}

impl ProcessGuard {
    pub(super) const fn new(paths: RuntimePaths) -> Self {
        Self { paths, pid: None }
    }

    pub(super) fn write_pid(&mut self, pid: u32) -> Result<(), LaunchError> {
        let path = self.paths.pid_path();
        atomic_write(path, format!("{pid}\n").as_bytes()).map_err(|source| {
            LaunchError::PidWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.pid = Some(pid);
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(())
    }

    pub(super) fn write_health(&self, status: HealthState) -> Result<(), LaunchError> {
        let pid = self.pid.ok_or(LaunchError::MissingPid)?;
        let snapshot = HealthSnapshot::new(status, pid)?;
        let mut payload = serde_json::to_vec(&snapshot)?;
        payload.push(b'\n');
        let path = self.paths.health_path();
        atomic_write(path, &payload).map_err(|source| LaunchError::HealthWrite {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            target: PROCESS_TARGET,
            status = snapshot.status,
            file = %path.display(),
            "health snapshot updated"
        );
        Ok(())
    }

    #[cfg(test)]
    pub(super) const fn paths(&self) -> &RuntimePaths {
        &self.paths
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        remove_quietly(self.paths.pid_path(), "pid");
        remove_quietly(self.paths.health_path(), "health");
    }
}

fn remove_quietly(path: &Path, kind: &str) {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => {
            warn!(
                target: PROCESS_TARGET,
                file = %path.display(),
                kind,
                error = %error,
                "failed to remove runtime file"
            );
        }
        _ => {}
    }
}

/// Lifecycle state published in the health file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HealthState {
    Starting,
    Ready,
    Stopping,
}

impl HealthState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthSnapshot {
    status: &'static str,
    pid: u32,
    timestamp: u64,
}

impl HealthSnapshot {
    fn new(state: HealthState, pid: u32) -> Result<Self, LaunchError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|source| LaunchError::Clock { source })?
            .as_secs();
        Ok(Self {
            status: state.as_str(),
            pid,
            timestamp,
        })
    }
}
