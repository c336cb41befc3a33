//! Top-level error type for the task runner.

use std::sync::Arc;

use thiserror::Error;

use crate::clean::CleanError;
use crate::install::InstallError;
use crate::output::OutputError;
use crate::project::ProjectError;
use crate::supervisor::SupervisorError;
use crate::tasks::TaskError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Clean(#[from] CleanError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl AppError {
    /// Process exit status for this failure.
    #[must_use]
    pub(crate) fn exit_status(&self) -> u8 {
        match self {
            Self::Task(error) => error.exit_status(),
            Self::CliUsage(error) => u8::try_from(error.exit_code()).unwrap_or(1),
            _ => 1,
        }
    }
}
