//! Derives runtime artefact paths shared by the task runner and the server.
//!
//! The runtime directory houses the pid and health snapshots written by
//! `shinobid`. Files are keyed by the listening port so a development
//! server and a production server on the same host never collide, and so
//! the supervisor can locate the snapshot of the worker it launched.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

/// Canonical paths for runtime artefacts written by the server.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    runtime_dir: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration, creating the
    /// directory when it does not exist yet.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let runtime_dir = config
            .runtime_dir
            .clone()
            .unwrap_or_else(default_runtime_directory);
        fs::create_dir_all(&runtime_dir).map_err(|source| RuntimePathsError::RuntimeDirectory {
            path: runtime_dir.clone(),
            source,
        })?;
        Ok(Self::in_directory(runtime_dir, config.port))
    }

    /// Builds the layout for `port` inside `runtime_dir` without touching
    /// the filesystem.
    #[must_use]
    pub fn in_directory(runtime_dir: PathBuf, port: u16) -> Self {
        Self {
            pid_path: runtime_dir.join(format!("shinobid-{port}.pid")),
            health_path: runtime_dir.join(format!("shinobid-{port}.health")),
            runtime_dir,
        }
    }

    /// Directory holding runtime artefacts.
    #[must_use]
    pub fn runtime_dir(&self) -> &Path {
        self.runtime_dir.as_path()
    }

    /// Path to the PID file.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the health snapshot.
    #[must_use]
    pub fn health_path(&self) -> &Path {
        self.health_path.as_path()
    }
}

/// Directory used when `runtime_dir` is not configured.
#[must_use]
pub fn default_runtime_directory() -> PathBuf {
    #[cfg(unix)]
    {
        if let Some(mut dir) = runtime_dir() {
            dir.push("shinobi");
            return dir;
        }
        let mut dir = env::temp_dir();
        dir.push("shinobi");
        // SAFETY: geteuid has no preconditions and cannot fail.
        dir.push(format!("uid-{}", unsafe { geteuid() }));
        dir
    }

    #[cfg(not(unix))]
    {
        let mut dir = env::temp_dir();
        dir.push("shinobi");
        dir
    }
}

/// Errors raised while deriving runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
