//! Line-oriented writers shared by every command.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

/// Failure to write command output.
#[derive(Debug, Error)]
#[error("failed to write command output: {0}")]
pub struct OutputError(#[source] io::Error);

/// Borrowed stdout and stderr writers.
///
/// Each line is flushed immediately so it interleaves sensibly with the
/// output of child processes that inherit the terminal.
pub(crate) struct CommandOutput<W: Write, E: Write> {
    stdout: W,
    stderr: E,
}

impl<W: Write, E: Write> CommandOutput<W, E> {
    pub(crate) const fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    pub(crate) fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), OutputError> {
        write_line(&mut self.stdout, args)
    }

    pub(crate) fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), OutputError> {
        write_line(&mut self.stderr, args)
    }
}

fn write_line<T: Write>(target: &mut T, args: fmt::Arguments<'_>) -> Result<(), OutputError> {
    target.write_fmt(args).map_err(OutputError)?;
    target.write_all(b"\n").map_err(OutputError)?;
    target.flush().map_err(OutputError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_routed_to_their_stream() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut output = CommandOutput::new(&mut stdout, &mut stderr);
        output.stdout_line(format_args!("ready on {}", 8000)).expect("stdout");
        output.stderr_line(format_args!("warning")).expect("stderr");
        assert_eq!(String::from_utf8(stdout).expect("utf8"), "ready on 8000\n");
        assert_eq!(String::from_utf8(stderr).expect("utf8"), "warning\n");
    }
}
