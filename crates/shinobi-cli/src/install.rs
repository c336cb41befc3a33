//! Dependency installer behind `shinobi install` and `shinobi install-dev`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use thiserror::Error;

use crate::manifest::{Manifest, ManifestError};
use crate::output::{CommandOutput, OutputError};
use crate::project::{DevPackage, DevPackageKind, Project};
use crate::receipt::{self, InstallProfile, InstallReceipt, ReceiptError};
use crate::runner::{CommandRunner, Completion, ToolCommand};

/// Errors that abort an install. No receipt is written after any of them.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The runtime manifest could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// The receipt could not be removed or written.
    #[error(transparent)]
    Receipt(#[from] ReceiptError),
    /// A tool could not be started.
    #[error("failed to run `{command}`: {source}")]
    Launch {
        /// Rendered command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The locked dependency fetch failed.
    #[error("dependency resolution failed: `{command}` finished with {completion}")]
    Resolution {
        /// Rendered command line.
        command: String,
        /// How the fetch finished.
        completion: Completion,
    },
    /// Probing installed development packages failed.
    #[error("failed to list installed packages: `{command}` finished with {completion}")]
    Probe {
        /// Rendered command line.
        command: String,
        /// How the probe finished.
        completion: Completion,
    },
    /// A development package failed to install.
    #[error("failed to install {package}: `{command}` finished with {completion}")]
    Package {
        /// Package description.
        package: String,
        /// Rendered command line.
        command: String,
        /// How the install finished.
        completion: Completion,
    },
    /// Progress could not be reported.
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Summary of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InstallReport {
    pub(crate) profile: InstallProfile,
    pub(crate) locked_packages: usize,
    pub(crate) installed: Vec<String>,
    pub(crate) skipped: Vec<String>,
}

/// Installs the manifests for `profile` and records a receipt.
pub(crate) fn install<R, W, E>(
    project: &Project,
    profile: InstallProfile,
    runner: &R,
    output: &mut CommandOutput<W, E>,
) -> Result<InstallReport, InstallError>
where
    R: CommandRunner,
    W: Write,
    E: Write,
{
    let root = project.root();
    receipt::remove(root)?;

    let runtime = Manifest::runtime(root)?;
    output.stdout_line(format_args!(
        "fetching {} locked packages",
        runtime.entries().len()
    ))?;
    let fetch = ToolCommand::new("cargo", ["fetch", "--locked"], root);
    let completion = run_tool(runner, &fetch)?;
    if !completion.succeeded() {
        return Err(InstallError::Resolution {
            command: fetch.display(),
            completion,
        });
    }

    let mut report = InstallReport {
        profile,
        locked_packages: runtime.entries().len(),
        installed: Vec::new(),
        skipped: Vec::new(),
    };
    let development = match profile {
        InstallProfile::Runtime => None,
        InstallProfile::Development => {
            let packages = project.dev_packages();
            install_dev_packages(project, &packages, runner, output, &mut report)?;
            Some(Manifest::development(&packages))
        }
    };

    let receipt = InstallReceipt::new(profile, &runtime, development.as_ref())?;
    receipt::write(root, &receipt)?;
    Ok(report)
}

fn install_dev_packages<R, W, E>(
    project: &Project,
    packages: &[DevPackage],
    runner: &R,
    output: &mut CommandOutput<W, E>,
    report: &mut InstallReport,
) -> Result<(), InstallError>
where
    R: CommandRunner,
    W: Write,
    E: Write,
{
    let inventory = Inventory::probe(project, packages, runner)?;
    for package in packages {
        if inventory.satisfies(package) {
            output.stdout_line(format_args!("{package} already installed"))?;
            report.skipped.push(package.to_string());
            continue;
        }
        output.stdout_line(format_args!("installing {package}"))?;
        let command = install_command(project, package);
        let completion = run_tool(runner, &command)?;
        if !completion.succeeded() {
            return Err(InstallError::Package {
                package: package.to_string(),
                command: command.display(),
                completion,
            });
        }
        report.installed.push(package.to_string());
    }
    Ok(())
}

fn install_command(project: &Project, package: &DevPackage) -> ToolCommand {
    match package.kind {
        DevPackageKind::Component => ToolCommand::new(
            "rustup",
            ["component", "add", package.name.as_str()],
            project.root(),
        ),
        DevPackageKind::Cargo => {
            let mut args = vec!["install".to_owned(), "--locked".to_owned()];
            args.push(package.name.clone());
            if let Some(version) = &package.version {
                args.push("--version".to_owned());
                args.push(version.clone());
            }
            ToolCommand::new("cargo", args, project.root())
        }
    }
}

fn run_tool<R: CommandRunner>(runner: &R, command: &ToolCommand) -> Result<Completion, InstallError> {
    runner
        .run(command)
        .map_err(|source| InstallError::Launch {
            command: command.display(),
            source,
        })
}

/// Development packages already present on the machine.
#[derive(Debug, Default)]
struct Inventory {
    components: BTreeSet<String>,
    tools: BTreeMap<String, String>,
}

impl Inventory {
    fn probe<R: CommandRunner>(
        project: &Project,
        packages: &[DevPackage],
        runner: &R,
    ) -> Result<Self, InstallError> {
        let mut inventory = Self::default();
        if packages.iter().any(|p| p.kind == DevPackageKind::Component) {
            let listing = capture(
                runner,
                &ToolCommand::new("rustup", ["component", "list", "--installed"], project.root()),
            )?;
            inventory.components = listing
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if packages.iter().any(|p| p.kind == DevPackageKind::Cargo) {
            let listing = capture(
                runner,
                &ToolCommand::new("cargo", ["install", "--list"], project.root()),
            )?;
            inventory.tools = parse_install_list(&listing);
        }
        Ok(inventory)
    }

    fn satisfies(&self, package: &DevPackage) -> bool {
        match package.kind {
            DevPackageKind::Component => self
                .components
                .iter()
                .any(|installed| component_matches(installed, &package.name)),
            DevPackageKind::Cargo => self.tools.get(&package.name).is_some_and(|installed| {
                package
                    .version
                    .as_deref()
                    .is_none_or(|wanted| wanted.trim_start_matches('=') == installed)
            }),
        }
    }
}

/// Architectures that open the target triple rustup appends to component names.
const TARGET_ARCHITECTURES: &[&str] = &[
    "x86_64",
    "i686",
    "aarch64",
    "arm",
    "armv7",
    "riscv64gc",
    "powerpc64le",
    "s390x",
    "loongarch64",
    "wasm32",
];

/// Whether a `rustup component list --installed` line provides `wanted`.
///
/// Lines are either the bare component name or the name followed by a target
/// triple. `*-preview` components are listed under their stable name.
fn component_matches(installed: &str, wanted: &str) -> bool {
    let stable = wanted.strip_suffix("-preview");
    [Some(wanted), stable].into_iter().flatten().any(|name| {
        installed == name
            || installed
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('-'))
                .and_then(|triple| triple.split('-').next())
                .is_some_and(|arch| TARGET_ARCHITECTURES.contains(&arch))
    })
}

fn capture<R: CommandRunner>(runner: &R, command: &ToolCommand) -> Result<String, InstallError> {
    let captured = runner
        .capture(command)
        .map_err(|source| InstallError::Launch {
            command: command.display(),
            source,
        })?;
    if !captured.completion.succeeded() {
        return Err(InstallError::Probe {
            command: command.display(),
            completion: captured.completion,
        });
    }
    Ok(captured.stdout)
}

/// Parses `cargo install --list`, whose crate lines read `name v1.2.3:`.
fn parse_install_list(listing: &str) -> BTreeMap<String, String> {
    listing
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .filter_map(|line| {
            let (name, rest) = line.split_once(' ')?;
            let version = rest.split([' ', ':']).next()?.strip_prefix('v')?;
            Some((name.to_owned(), version.to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("rust-src", "rust", false)]
    #[case("rust-std-x86_64-unknown-linux-gnu", "rust", false)]
    #[case("rust-x86_64-unknown-linux-gnu", "rust", true)]
    #[case("rust-src", "rust-src", true)]
    #[case("clippy-aarch64-apple-darwin", "clippy", true)]
    #[case("llvm-tools-x86_64-unknown-linux-gnu", "llvm-tools-preview", true)]
    #[case("llvm-tools-preview-x86_64-unknown-linux-gnu", "llvm-tools-preview", true)]
    #[case("rustfmt-preview-extra", "rustfmt", false)]
    fn components_match_by_name_or_target_suffix(
        #[case] installed: &str,
        #[case] wanted: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(component_matches(installed, wanted), expected);
    }

    #[test]
    fn install_list_lines_yield_names_and_versions() {
        let listing = "cargo-llvm-cov v0.6.16:\n    cargo-llvm-cov\ncargo-sort v2.0.1 (https://example.invalid#abc):\n    cargo-sort\n";
        let tools = parse_install_list(listing);
        assert_eq!(tools.get("cargo-llvm-cov").map(String::as_str), Some("0.6.16"));
        assert_eq!(tools.get("cargo-sort").map(String::as_str), Some("2.0.1"));
        assert_eq!(tools.len(), 2);
    }

    #[rstest]
    #[case(DevPackageKind::Component, "clippy", None, true)]
    #[case(DevPackageKind::Component, "rustfmt", None, true)]
    #[case(DevPackageKind::Component, "rust-src", None, true)]
    #[case(DevPackageKind::Component, "rust", None, false)]
    #[case(DevPackageKind::Cargo, "cargo-sort", None, true)]
    #[case(DevPackageKind::Cargo, "cargo-sort", Some("2.0.1"), true)]
    #[case(DevPackageKind::Cargo, "cargo-sort", Some("=2.0.1"), true)]
    #[case(DevPackageKind::Cargo, "cargo-sort", Some("1.0.9"), false)]
    #[case(DevPackageKind::Cargo, "cargo-nextest", None, false)]
    fn inventory_matches_packages(
        #[case] kind: DevPackageKind,
        #[case] name: &str,
        #[case] version: Option<&str>,
        #[case] expected: bool,
    ) {
        let inventory = Inventory {
            components: ["clippy-x86_64-unknown-linux-gnu", "rustfmt", "rust-src"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            tools: BTreeMap::from([("cargo-sort".to_owned(), "2.0.1".to_owned())]),
        };
        let package = DevPackage {
            kind,
            name: name.to_owned(),
            version: version.map(str::to_owned),
        };
        assert_eq!(inventory.satisfies(&package), expected);
    }
}
