//! Inner-loop tasks: `format`, `lint`, and `test`.
//!
//! Formatting and testing stop at the first failing step. Linting runs every
//! check so one invocation reports every problem.

use std::io::{self, Write};

use thiserror::Error;

use crate::output::{CommandOutput, OutputError};
use crate::project::{Project, TaskKind, ToolStep};
use crate::runner::{CommandRunner, Completion, ToolCommand};

/// Errors surfaced by inner-loop tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The tool behind a step is not installed.
    #[error("{task}: `{program}` is not installed; run `shinobi install-dev`")]
    ToolMissing {
        /// Task name.
        task: String,
        /// Program that could not be found.
        program: String,
    },
    /// A tool could not be started for another reason.
    #[error("{task}: failed to run `{command}`: {source}")]
    Launch {
        /// Task name.
        task: String,
        /// Rendered command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A step that stops its task failed.
    #[error("{task}: {label} failed with {completion}")]
    StepFailed {
        /// Task name.
        task: String,
        /// Step label.
        label: String,
        /// How the tool finished.
        completion: Completion,
    },
    /// One or more lint checks failed.
    #[error("lint: {} check(s) failed: {}", .failed.len(), .failed.join(", "))]
    ChecksFailed {
        /// Labels of the failing checks, in run order.
        failed: Vec<String>,
    },
    /// Progress could not be reported.
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl TaskError {
    /// Exit status reported to the operator; tool exit codes pass through.
    #[must_use]
    pub(crate) fn exit_status(&self) -> u8 {
        match self {
            Self::StepFailed {
                completion: Completion::Failed { code: Some(code) },
                ..
            } => u8::try_from(*code)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

/// Verdict for one lint check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Passed,
    Failed,
    Missing,
}

/// Runs `task` with the steps configured for `project`.
pub(crate) fn run_task<R, W, E>(
    task: TaskKind,
    project: &Project,
    runner: &R,
    output: &mut CommandOutput<W, E>,
) -> Result<(), TaskError>
where
    R: CommandRunner,
    W: Write,
    E: Write,
{
    let steps = project.steps(task);
    match task {
        TaskKind::Format | TaskKind::Test => run_until_failure(task, project, &steps, runner, output),
        TaskKind::Lint => run_all_checks(project, &steps, runner, output),
    }
}

fn run_until_failure<R, W, E>(
    task: TaskKind,
    project: &Project,
    steps: &[ToolStep],
    runner: &R,
    output: &mut CommandOutput<W, E>,
) -> Result<(), TaskError>
where
    R: CommandRunner,
    W: Write,
    E: Write,
{
    for step in steps {
        output.stdout_line(format_args!("==> {task}: {}", step.label))?;
        let completion = run_step(task, project, step, runner)?;
        if !completion.succeeded() {
            return Err(TaskError::StepFailed {
                task: task.to_string(),
                label: step.label.clone(),
                completion,
            });
        }
    }
    Ok(())
}

fn run_all_checks<R, W, E>(
    project: &Project,
    steps: &[ToolStep],
    runner: &R,
    output: &mut CommandOutput<W, E>,
) -> Result<(), TaskError>
where
    R: CommandRunner,
    W: Write,
    E: Write,
{
    let mut verdicts = Vec::with_capacity(steps.len());
    for step in steps {
        output.stdout_line(format_args!("==> lint: {}", step.label))?;
        let verdict = match run_step(TaskKind::Lint, project, step, runner) {
            Ok(completion) if completion.succeeded() => Verdict::Passed,
            Ok(_) => Verdict::Failed,
            Err(TaskError::ToolMissing { program, .. }) => {
                output.stderr_line(format_args!("lint: `{program}` is not installed"))?;
                Verdict::Missing
            }
            Err(error) => return Err(error),
        };
        verdicts.push((step.label.as_str(), verdict));
    }

    output.stdout_line(format_args!("lint summary:"))?;
    for (label, verdict) in &verdicts {
        let text = match verdict {
            Verdict::Passed => "ok",
            Verdict::Failed => "FAILED",
            Verdict::Missing => "MISSING",
        };
        output.stdout_line(format_args!("  {label}: {text}"))?;
    }

    let failed: Vec<String> = verdicts
        .iter()
        .filter(|(_, verdict)| *verdict != Verdict::Passed)
        .map(|(label, _)| (*label).to_owned())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(TaskError::ChecksFailed { failed })
    }
}

fn run_step<R: CommandRunner>(
    task: TaskKind,
    project: &Project,
    step: &ToolStep,
    runner: &R,
) -> Result<Completion, TaskError> {
    let command = ToolCommand::new(step.program.as_str(), step.args.iter().cloned(), project.root());
    runner.run(&command).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            TaskError::ToolMissing {
                task: task.to_string(),
                program: step.program.clone(),
            }
        } else {
            TaskError::Launch {
                task: task.to_string(),
                command: command.display(),
                source,
            }
        }
    })
}
