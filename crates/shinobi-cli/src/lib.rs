//! Task runner for the Shinobi registry service.
//!
//! `shinobi` installs dependencies, drives the format / lint / test inner
//! loop, clears derived caches, and supervises a development server that
//! reloads when sources change. The runtime is exposed as [`run`] so tests
//! can substitute the configuration loader, the external tool runner, and
//! the IO streams.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;

mod clean;
mod cli;
mod config;
mod errors;
mod install;
mod manifest;
mod output;
mod project;
mod receipt;
mod runner;
mod supervisor;
mod tasks;

#[cfg(test)]
mod tests;

pub use clean::{CleanError, CleanFailure};
pub use install::InstallError;
pub use manifest::ManifestError;
pub use output::OutputError;
pub use project::ProjectError;
pub use receipt::ReceiptError;
pub use runner::Completion;
pub use supervisor::SupervisorError;
pub use tasks::TaskError;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;
use install::InstallReport;
use output::CommandOutput;
use project::{Project, TaskKind};
use receipt::InstallProfile;
use runner::{CommandRunner, SystemRunner};
use supervisor::{Supervisor, WorkerLaunch};

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the task-runner relevant fields of
/// `shinobi_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--log-filter",
    "--log-format",
];

struct CliRunner<'a, L: ConfigLoader, R: CommandRunner> {
    loader: &'a L,
    tools: &'a R,
    stop: Option<Arc<AtomicBool>>,
}

impl<'a, L, R> CliRunner<'a, L, R>
where
    L: ConfigLoader,
    R: CommandRunner,
{
    const fn new(loader: &'a L, tools: &'a R) -> Self {
        Self {
            loader,
            tools,
            stop: None,
        }
    }

    #[cfg(test)]
    fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn run<I, W, E>(&self, args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        W: Write,
        E: Write,
    {
        let mut output = CommandOutput::new(&mut *stdout, &mut *stderr);
        let result = self.execute(args, &mut output);
        let reported = match &result {
            Ok(()) => return ExitCode::SUCCESS,
            Err(AppError::CliUsage(error)) if !error.use_stderr() => {
                let text = error.render().to_string();
                return match output.stdout_line(format_args!("{}", text.trim_end())) {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(_) => ExitCode::FAILURE,
                };
            }
            Err(error @ AppError::CliUsage(_)) => {
                output.stderr_line(format_args!("{}", error.to_string().trim_end()))
            }
            Err(error) => output.stderr_line(format_args!("shinobi: {error}")),
        };
        match (result, reported) {
            (Err(error), Ok(())) => ExitCode::from(error.exit_status()),
            _ => ExitCode::FAILURE,
        }
    }

    fn execute<I, W, E>(&self, args: I, output: &mut CommandOutput<W, E>) -> Result<(), AppError>
    where
        I: IntoIterator<Item = OsString>,
        W: Write,
        E: Write,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli = Cli::try_parse_from(&split.command_arguments).map_err(AppError::CliUsage)?;
        let config = self.loader.load(&split.config_arguments)?;
        let project = Project::load(&cli.project_dir)?;

        match cli.command {
            CliCommand::Install => {
                let report = install::install(&project, InstallProfile::Runtime, self.tools, output)?;
                report_install(&report, output)
            }
            CliCommand::InstallDev => {
                let report =
                    install::install(&project, InstallProfile::Development, self.tools, output)?;
                report_install(&report, output)
            }
            CliCommand::Format => self.task(TaskKind::Format, &project, output),
            CliCommand::Lint => self.task(TaskKind::Lint, &project, output),
            CliCommand::Test => self.task(TaskKind::Test, &project, output),
            CliCommand::Clean => {
                let report = clean::clean(&project, output)?;
                output.stdout_line(format_args!(
                    "clean: removed {} path(s), {} already absent",
                    report.removed.len(),
                    report.absent
                ))?;
                Ok(())
            }
            CliCommand::Run => {
                supervisor::ensure_installed(&project)?;
                let launch = WorkerLaunch::new(&project, &config, &split.config_arguments)?;
                let stop = match &self.stop {
                    Some(stop) => Arc::clone(stop),
                    None => supervisor::install_stop_flag()?,
                };
                Supervisor::new(&project, launch, stop).run(output)?;
                Ok(())
            }
        }
    }

    fn task<W: Write, E: Write>(
        &self,
        task: TaskKind,
        project: &Project,
        output: &mut CommandOutput<W, E>,
    ) -> Result<(), AppError> {
        tasks::run_task(task, project, self.tools, output)?;
        output.stdout_line(format_args!("{task}: ok"))?;
        Ok(())
    }
}

fn report_install<W: Write, E: Write>(
    report: &InstallReport,
    output: &mut CommandOutput<W, E>,
) -> Result<(), AppError> {
    output.stdout_line(format_args!(
        "{} dependencies installed: {} locked package(s) fetched",
        report.profile, report.locked_packages
    ))?;
    if report.profile == InstallProfile::Development {
        output.stdout_line(format_args!(
            "development tools: {} installed, {} already present",
            report.installed.len(),
            report.skipped.len()
        ))?;
    }
    Ok(())
}

/// Runs the task runner with the given arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    CliRunner::new(&OrthoConfigLoader, &SystemRunner).run(args, stdout, stderr)
}
