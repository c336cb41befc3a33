//! Test doubles shared by the behavioural suites.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::net::{Ipv4Addr, TcpListener};
use std::path::Path;

use tempfile::TempDir;

use shinobi_config::Config;

use crate::AppError;
use crate::config::ConfigLoader;
use crate::manifest::Manifest;
use crate::project::{PROJECT_FILE, Project};
use crate::receipt::{self, InstallProfile, InstallReceipt};
use crate::runner::{CapturedOutput, CommandRunner, Completion, ToolCommand};

pub(crate) const LOCK_FILE: &str = r#"version = 4

[[package]]
name = "serde"
version = "1.0.219"
source = "registry+https://github.com/rust-lang/crates.io-index"

[[package]]
name = "shinobid"
version = "0.1.0"
dependencies = ["serde"]
"#;

/// Records every command and answers from a script.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    calls: RefCell<Vec<String>>,
    failures: HashMap<String, Completion>,
    missing: HashSet<String>,
    captures: HashMap<String, String>,
}

impl ScriptedRunner {
    /// Makes `command` (rendered as `program args...`) exit with `code`.
    pub(crate) fn failing(mut self, command: &str, code: i32) -> Self {
        self.failures
            .insert(command.to_owned(), Completion::Failed { code: Some(code) });
        self
    }

    /// Makes `program` unavailable.
    pub(crate) fn missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_owned());
        self
    }

    /// Supplies stdout for a captured `command`.
    pub(crate) fn capturing(mut self, command: &str, stdout: &str) -> Self {
        self.captures.insert(command.to_owned(), stdout.to_owned());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn answer(&self, command: &ToolCommand) -> io::Result<Completion> {
        let rendered = command.display();
        self.calls.borrow_mut().push(rendered.clone());
        if self.missing.contains(&command.program) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not installed"));
        }
        Ok(self
            .failures
            .get(&rendered)
            .copied()
            .unwrap_or(Completion::Succeeded))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<Completion> {
        self.answer(command)
    }

    fn capture(&self, command: &ToolCommand) -> io::Result<CapturedOutput> {
        let completion = self.answer(command)?;
        Ok(CapturedOutput {
            completion,
            stdout: self
                .captures
                .get(&command.display())
                .cloned()
                .unwrap_or_default(),
        })
    }
}

/// Hands out a fixed configuration.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixedConfigLoader {
    pub(crate) config: Config,
}

impl ConfigLoader for FixedConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Temporary workspace with a lock file and an optional project file.
pub(crate) struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("Cargo.lock"), LOCK_FILE).expect("write lock file");
        Self { dir }
    }

    pub(crate) fn with_project_file(self, contents: &str) -> Self {
        self.write(PROJECT_FILE, contents);
        self
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write file");
    }

    pub(crate) fn project(&self) -> Project {
        Project::load(self.root()).expect("load project")
    }

    /// Records a current receipt, as a successful install would.
    pub(crate) fn mark_installed(&self, profile: InstallProfile) {
        let project = self.project();
        let runtime = Manifest::runtime(self.root()).expect("runtime manifest");
        let development = Manifest::development(&project.dev_packages());
        let development = (profile == InstallProfile::Development).then_some(&development);
        let receipt = InstallReceipt::new(profile, &runtime, development).expect("receipt");
        receipt::write(self.root(), &receipt).expect("write receipt");
    }
}

pub(crate) fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind ephemeral port");
    listener.local_addr().expect("listener address").port()
}

pub(crate) fn text(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer).into_owned()
}
