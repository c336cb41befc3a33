//! Best-effort removal of derived caches.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::output::{CommandOutput, OutputError};
use crate::project::{CleanSettings, PROJECT_FILE, Project};

const MANIFESTS: &[&str] = &["Cargo.toml", "Cargo.lock", PROJECT_FILE];
const PROTECTED_DIRECTORIES: &[&str] = &["src", "crates", ".git"];
const PROTECTED_EXTENSIONS: &[&str] = &["rs", "toml", "lock"];
const SKIPPED_DIRECTORIES: &[&str] = &[".git", "target"];

/// A path `clean` failed to remove.
#[derive(Debug)]
pub struct CleanFailure {
    /// Path that was not removed.
    pub path: PathBuf,
    /// Underlying IO error.
    pub source: io::Error,
}

impl fmt::Display for CleanFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} ({})", self.path.display(), self.source)
    }
}

/// Errors surfaced by `clean`.
#[derive(Debug, Error)]
pub enum CleanError {
    /// A configured path is outside the workspace or touches sources.
    #[error("refusing to clean {path:?}: {reason}")]
    Refused {
        /// Configured path.
        path: PathBuf,
        /// Why the path is refused.
        reason: &'static str,
    },
    /// A configured extension would sweep sources or manifests.
    #[error("refusing to sweep `{extension}` files: {reason}")]
    RefusedExtension {
        /// Configured extension.
        extension: String,
        /// Why the extension is refused.
        reason: &'static str,
    },
    /// Some targets could not be removed.
    #[error("failed to remove {} path(s): {}", .failures.len(), render_failures(.failures))]
    Failures {
        /// Every failure, in discovery order.
        failures: Vec<CleanFailure>,
    },
    /// Progress could not be reported.
    #[error(transparent)]
    Output(#[from] OutputError),
}

fn render_failures(failures: &[CleanFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// What a clean run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CleanReport {
    pub(crate) removed: Vec<PathBuf>,
    pub(crate) absent: usize,
}

/// Removes configured paths and matching files under the project root.
///
/// Every configured path is validated before anything is deleted. Removal
/// failures do not stop the run; they are collected and reported together.
pub(crate) fn clean<W: Write, E: Write>(
    project: &Project,
    output: &mut CommandOutput<W, E>,
) -> Result<CleanReport, CleanError> {
    let root = project.root();
    let settings = project.clean();
    for path in &settings.paths {
        validate(path)?;
    }
    for extension in &settings.extensions {
        validate_extension(extension)?;
    }

    let mut report = CleanReport::default();
    let mut failures = Vec::new();
    let mut targets: Vec<PathBuf> = settings.paths.iter().map(|path| root.join(path)).collect();
    sweep_extensions(root, settings, &mut targets, &mut failures);

    for target in targets {
        match remove(&target) {
            Ok(true) => {
                output.stdout_line(format_args!("removed {}", display_relative(root, &target)))?;
                report.removed.push(target);
            }
            Ok(false) => report.absent += 1,
            Err(source) => failures.push(CleanFailure {
                path: target,
                source,
            }),
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(CleanError::Failures { failures })
    }
}

fn validate(path: &Path) -> Result<(), CleanError> {
    let refuse = |reason| {
        Err(CleanError::Refused {
            path: path.to_path_buf(),
            reason,
        })
    };
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return refuse("path escapes the workspace root");
            }
        }
    }
    if parts.is_empty() {
        return refuse("path names the workspace root");
    }
    if parts
        .iter()
        .any(|part| PROTECTED_DIRECTORIES.iter().any(|name| part == name))
    {
        return refuse("path lies inside a source tree");
    }
    if parts
        .last()
        .is_some_and(|last| MANIFESTS.iter().any(|name| last == name))
    {
        return refuse("path names a manifest");
    }
    Ok(())
}

fn validate_extension(extension: &str) -> Result<(), CleanError> {
    let bare = extension.trim_start_matches('.');
    let reason = if bare.is_empty() {
        "extension is empty"
    } else if PROTECTED_EXTENSIONS
        .iter()
        .any(|protected| bare.eq_ignore_ascii_case(protected))
    {
        "extension matches sources or manifests"
    } else {
        return Ok(());
    };
    Err(CleanError::RefusedExtension {
        extension: extension.to_owned(),
        reason,
    })
}

/// Collects files whose extension is configured, skipping VCS and build trees.
fn sweep_extensions(
    root: &Path,
    settings: &CleanSettings,
    targets: &mut Vec<PathBuf>,
    failures: &mut Vec<CleanFailure>,
) {
    if settings.extensions.is_empty() {
        return;
    }
    let mut pending = vec![root.to_path_buf()];
    while let Some(directory) = pending.pop() {
        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(source) => {
                failures.push(CleanFailure {
                    path: directory,
                    source,
                });
                continue;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    failures.push(CleanFailure {
                        path: directory.clone(),
                        source,
                    });
                    continue;
                }
            };
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                let skipped = SKIPPED_DIRECTORIES
                    .iter()
                    .any(|name| entry.file_name() == *name);
                if !skipped {
                    pending.push(path);
                }
            } else if has_extension(&path, &settings.extensions) && !targets.contains(&path) {
                targets.push(path);
            }
        }
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension().is_some_and(|extension| {
        extensions
            .iter()
            .any(|wanted| extension == wanted.trim_start_matches('.'))
    })
}

/// Returns `Ok(false)` when the path did not exist.
fn remove(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    let removal = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removal {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
