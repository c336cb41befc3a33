//! Command-line surface of the `shinobi` task runner.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Task runner for the Shinobi registry service.
#[derive(Parser, Debug)]
#[command(name = "shinobi", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Workspace root holding `Cargo.toml` and `shinobi.toml`.
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub(crate) project_dir: PathBuf,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operator commands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Installs the runtime dependencies from the lock file.
    Install,
    /// Installs runtime dependencies plus the development toolchain.
    InstallDev,
    /// Rewrites sources and manifests to their canonical style.
    Format,
    /// Runs every style, type, format and import-order check.
    Lint,
    /// Runs the test suite with coverage.
    Test,
    /// Serves the application in development mode, reloading on change.
    Run,
    /// Deletes derived build and coverage caches.
    Clean,
}

impl fmt::Display for CliCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Install => "install",
            Self::InstallDev => "install-dev",
            Self::Format => "format",
            Self::Lint => "lint",
            Self::Test => "test",
            Self::Run => "run",
            Self::Clean => "clean",
        })
    }
}
