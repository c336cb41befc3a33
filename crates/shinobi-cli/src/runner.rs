//! External tool invocation.
//!
//! Every command the task runner delegates to (`cargo`, `rustup`, formatters,
//! linters) goes through [`CommandRunner`] so orchestration can be exercised
//! without spawning real toolchains.

use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// A program, its arguments, and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ToolCommand {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) cwd: PathBuf,
}

impl ToolCommand {
    pub(crate) fn new<P, I, S>(program: P, args: I, cwd: &Path) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Shell-like rendering used in diagnostics.
    #[must_use]
    pub(crate) fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(OsStr::new(&self.program));
        command.args(&self.args).current_dir(&self.cwd);
        command
    }
}

/// How a tool finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Exit status zero.
    Succeeded,
    /// Any other outcome.
    Failed {
        /// Exit code, or `None` when the tool was killed by a signal.
        code: Option<i32>,
    },
}

impl Completion {
    #[must_use]
    pub(crate) const fn succeeded(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<ExitStatus> for Completion {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Self::Succeeded
        } else {
            Self::Failed {
                code: status.code(),
            }
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => formatter.write_str("exit status 0"),
            Self::Failed { code: Some(code) } => write!(formatter, "exit status {code}"),
            Self::Failed { code: None } => formatter.write_str("terminated by signal"),
        }
    }
}

/// Captured result of a quiet tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CapturedOutput {
    pub(crate) completion: Completion,
    pub(crate) stdout: String,
}

/// Runs external tools.
pub(crate) trait CommandRunner {
    /// Runs `command` attached to the caller's terminal.
    fn run(&self, command: &ToolCommand) -> io::Result<Completion>;

    /// Runs `command` capturing stdout; stderr is discarded.
    fn capture(&self, command: &ToolCommand) -> io::Result<CapturedOutput>;
}

/// Runner that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<Completion> {
        command
            .to_command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map(Completion::from)
    }

    fn capture(&self, command: &ToolCommand) -> io::Result<CapturedOutput> {
        let output = command
            .to_command()
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;
        Ok(CapturedOutput {
            completion: Completion::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
