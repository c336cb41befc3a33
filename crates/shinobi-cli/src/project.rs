//! Workspace description read from `shinobi.toml`.
//!
//! The file is optional; every section falls back to the defaults used by
//! this repository. A minimal file looks like:
//!
//! ```toml
//! [[install.dev]]
//! kind = "cargo"
//! name = "cargo-llvm-cov"
//! version = "0.6"
//!
//! [[tasks.lint]]
//! label = "clippy"
//! program = "cargo"
//! args = ["clippy", "--workspace", "--", "-D", "warnings"]
//!
//! [watch]
//! roots = ["crates"]
//! extensions = ["rs", "toml"]
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Name of the project file at the workspace root.
pub(crate) const PROJECT_FILE: &str = "shinobi.toml";

/// Errors raised while reading the project file.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The workspace root does not exist or is not a directory.
    #[error("project directory {path:?} is not a directory")]
    MissingRoot {
        /// Offending path.
        path: PathBuf,
    },
    /// The project file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// Project file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The project file is not valid TOML for the expected schema.
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        /// Project file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },
    /// `[server] command` was configured empty.
    #[error("[server] command in {path:?} must name a program")]
    EmptyServerCommand {
        /// Project file path.
        path: PathBuf,
    },
}

/// How a development package is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DevPackageKind {
    /// A `rustup` toolchain component such as `clippy`.
    Component,
    /// A binary crate installed with `cargo install`.
    Cargo,
}

impl fmt::Display for DevPackageKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Component => "component",
            Self::Cargo => "cargo",
        })
    }
}

/// One entry of the development manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DevPackage {
    pub(crate) kind: DevPackageKind,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) version: Option<String>,
}

impl DevPackage {
    fn new(kind: DevPackageKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            version: None,
        }
    }
}

impl fmt::Display for DevPackage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(formatter, "{} {}@{version}", self.kind, self.name),
            None => write!(formatter, "{} {}", self.kind, self.name),
        }
    }
}

/// A single tool invocation inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ToolStep {
    pub(crate) label: String,
    pub(crate) program: String,
    #[serde(default)]
    pub(crate) args: Vec<String>,
}

impl ToolStep {
    fn cargo(label: &str, args: &[&str]) -> Self {
        Self {
            label: label.to_owned(),
            program: "cargo".to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
        }
    }
}

/// Inner-loop tasks configurable through `[tasks.<name>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    Format,
    Lint,
    Test,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Format => "format",
            Self::Lint => "lint",
            Self::Test => "test",
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct InstallSection {
    dev: Option<Vec<DevPackage>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TasksSection {
    format: Option<Vec<ToolStep>>,
    lint: Option<Vec<ToolStep>>,
    test: Option<Vec<ToolStep>>,
}

/// Source roots polled by the development supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WatchSettings {
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) extensions: Vec<String>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("crates")],
            extensions: vec!["rs".to_owned(), "toml".to_owned()],
        }
    }
}

/// Derived artefacts removed by `clean`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CleanSettings {
    pub(crate) paths: Vec<PathBuf>,
    pub(crate) extensions: Vec<String>,
}

impl Default for CleanSettings {
    fn default() -> Self {
        Self {
            paths: ["target/llvm-cov-target", "target/debug/incremental", "lcov.info", "coverage"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            extensions: vec!["profraw".to_owned()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    command: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProjectFile {
    install: InstallSection,
    tasks: TasksSection,
    watch: WatchSettings,
    clean: CleanSettings,
    server: ServerSection,
}

/// A workspace root together with its resolved project settings.
#[derive(Debug)]
pub(crate) struct Project {
    root: PathBuf,
    file: ProjectFile,
}

impl Project {
    /// Reads `shinobi.toml` under `root`, using defaults when it is absent.
    pub(crate) fn load(root: &Path) -> Result<Self, ProjectError> {
        if !root.is_dir() {
            return Err(ProjectError::MissingRoot {
                path: root.to_path_buf(),
            });
        }
        let path = root.join(PROJECT_FILE);
        let file = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<ProjectFile>(&text).map_err(|source| {
                ProjectError::Parse {
                    path: path.clone(),
                    source: Box::new(source),
                }
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => ProjectFile::default(),
            Err(source) => return Err(ProjectError::Read { path, source }),
        };
        if file
            .server
            .command
            .as_ref()
            .is_some_and(|command| command.first().is_none_or(String::is_empty))
        {
            return Err(ProjectError::EmptyServerCommand { path });
        }
        Ok(Self {
            root: root.to_path_buf(),
            file,
        })
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Development manifest in declaration order.
    pub(crate) fn dev_packages(&self) -> Vec<DevPackage> {
        self.file.install.dev.clone().unwrap_or_else(|| {
            vec![
                DevPackage::new(DevPackageKind::Component, "rustfmt"),
                DevPackage::new(DevPackageKind::Component, "clippy"),
                DevPackage::new(DevPackageKind::Component, "llvm-tools-preview"),
                DevPackage::new(DevPackageKind::Cargo, "cargo-sort"),
                DevPackage::new(DevPackageKind::Cargo, "cargo-llvm-cov"),
            ]
        })
    }

    /// Ordered tool steps for `task`.
    pub(crate) fn steps(&self, task: TaskKind) -> Vec<ToolStep> {
        let configured = match task {
            TaskKind::Format => self.file.tasks.format.as_ref(),
            TaskKind::Lint => self.file.tasks.lint.as_ref(),
            TaskKind::Test => self.file.tasks.test.as_ref(),
        };
        configured.cloned().unwrap_or_else(|| default_steps(task))
    }

    pub(crate) const fn watch(&self) -> &WatchSettings {
        &self.file.watch
    }

    pub(crate) const fn clean(&self) -> &CleanSettings {
        &self.file.clean
    }

    /// Program and leading arguments used to launch a worker.
    pub(crate) fn server_command(&self) -> Vec<String> {
        self.file.server.command.clone().unwrap_or_else(|| {
            ["cargo", "run", "--offline", "--bin", "shinobid", "--"]
                .into_iter()
                .map(str::to_owned)
                .collect()
        })
    }
}

fn default_steps(task: TaskKind) -> Vec<ToolStep> {
    match task {
        TaskKind::Format => vec![
            ToolStep::cargo("rustfmt", &["fmt", "--all"]),
            ToolStep::cargo("cargo-sort", &["sort", "--workspace"]),
        ],
        TaskKind::Lint => vec![
            ToolStep::cargo(
                "clippy",
                &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
            ),
            ToolStep::cargo("check", &["check", "--workspace", "--all-targets"]),
            ToolStep::cargo("rustfmt", &["fmt", "--all", "--", "--check"]),
            ToolStep::cargo("cargo-sort", &["sort", "--workspace", "--check"]),
        ],
        TaskKind::Test => vec![ToolStep::cargo(
            "llvm-cov",
            &["llvm-cov", "--workspace", "--summary-only"],
        )],
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn workspace() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    fn write_project(dir: &TempDir, contents: &str) {
        fs::write(dir.path().join(PROJECT_FILE), contents).expect("write project file");
    }

    #[rstest]
    fn missing_file_uses_defaults(workspace: TempDir) {
        let project = Project::load(workspace.path()).expect("defaults");
        assert_eq!(project.root(), workspace.path());
        assert_eq!(project.dev_packages().len(), 5);
        assert_eq!(project.steps(TaskKind::Lint).len(), 4);
        assert_eq!(project.watch(), &WatchSettings::default());
        assert_eq!(project.clean(), &CleanSettings::default());
        assert_eq!(
            project.server_command().first().map(String::as_str),
            Some("cargo")
        );
    }

    #[rstest]
    fn sections_override_defaults(workspace: TempDir) {
        write_project(
            &workspace,
            r#"
[[install.dev]]
kind = "cargo"
name = "cargo-nextest"
version = "0.9"

[[tasks.test]]
label = "nextest"
program = "cargo"
args = ["nextest", "run"]

[watch]
roots = ["src"]

[server]
command = ["target/debug/shinobid"]
"#,
        );
        let project = Project::load(workspace.path()).expect("parse");
        let packages = project.dev_packages();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].to_string(), "cargo cargo-nextest@0.9");
        let steps = project.steps(TaskKind::Test);
        assert_eq!(steps[0].label, "nextest");
        assert_eq!(project.steps(TaskKind::Format).len(), 2);
        assert_eq!(project.watch().roots, vec![PathBuf::from("src")]);
        assert_eq!(project.watch().extensions, vec!["rs", "toml"]);
        assert_eq!(project.server_command(), vec!["target/debug/shinobid"]);
    }

    #[rstest]
    #[case("[server]\ncommand = []\n")]
    #[case("[server]\ncommand = [\"\"]\n")]
    fn empty_server_commands_are_rejected(workspace: TempDir, #[case] contents: &str) {
        write_project(&workspace, contents);
        let error = Project::load(workspace.path()).expect_err("empty command");
        assert!(matches!(error, ProjectError::EmptyServerCommand { .. }));
    }

    #[rstest]
    #[case("[tasks.lint]\nlabel = 1\n")]
    #[case("[watch]\npatterns = [\"*.rs\"]\n")]
    #[case("[[install.dev]]\nkind = \"npm\"\nname = \"x\"\n")]
    fn malformed_files_are_reported(workspace: TempDir, #[case] contents: &str) {
        write_project(&workspace, contents);
        let error = Project::load(workspace.path()).expect_err("malformed");
        assert!(matches!(error, ProjectError::Parse { .. }));
    }

    #[rstest]
    fn the_sample_project_file_spells_out_the_defaults(workspace: TempDir) {
        write_project(&workspace, include_str!("../../../shinobi.toml"));
        let configured = Project::load(workspace.path()).expect("sample parses");
        let defaults = Project::load(TempDir::new().expect("temp dir").path()).expect("defaults");
        assert_eq!(configured.dev_packages(), defaults.dev_packages());
        for task in [TaskKind::Format, TaskKind::Lint, TaskKind::Test] {
            assert_eq!(configured.steps(task), defaults.steps(task));
        }
        assert_eq!(configured.watch(), defaults.watch());
        assert_eq!(configured.clean(), defaults.clean());
        assert_eq!(configured.server_command(), defaults.server_command());
    }

    #[test]
    fn missing_roots_are_rejected() {
        let error = Project::load(Path::new("/definitely/not/a/shinobi/root"))
            .expect_err("missing root");
        assert!(matches!(error, ProjectError::MissingRoot { .. }));
    }
}
