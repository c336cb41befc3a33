//! Dependency manifests and their fingerprints.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::project::DevPackage;

const LOCK_FILE: &str = "Cargo.lock";

/// Errors raised while reading the runtime manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The workspace has no lock file to install from.
    #[error("{path:?} not found; generate it with `cargo generate-lockfile`")]
    MissingLock {
        /// Expected lock file path.
        path: PathBuf,
    },
    /// The lock file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The lock file is not valid TOML.
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        /// Lock file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// A package name with its version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ManifestEntry {
    pub(crate) name: String,
    pub(crate) constraint: Option<String>,
}

/// Ordered list of packages installed together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Manifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Deserialize)]
struct LockFile {
    #[serde(default)]
    package: Vec<LockedPackage>,
}

#[derive(Deserialize)]
struct LockedPackage {
    name: String,
    version: String,
}

impl Manifest {
    /// Every locked package of the workspace, in lock file order.
    pub(crate) fn runtime(root: &Path) -> Result<Self, ManifestError> {
        let path = root.join(LOCK_FILE);
        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ManifestError::MissingLock { path: path.clone() }
            } else {
                ManifestError::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let lock: LockFile = toml::from_str(&text).map_err(|source| ManifestError::Parse {
            path,
            source: Box::new(source),
        })?;
        Ok(Self {
            entries: lock
                .package
                .into_iter()
                .map(|package| ManifestEntry {
                    name: package.name,
                    constraint: Some(package.version),
                })
                .collect(),
        })
    }

    /// Development packages, keyed by provisioning kind.
    pub(crate) fn development(packages: &[DevPackage]) -> Self {
        Self {
            entries: packages
                .iter()
                .map(|package| ManifestEntry {
                    name: format!("{}:{}", package.kind, package.name),
                    constraint: package.version.clone(),
                })
                .collect(),
        }
    }

    pub(crate) fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Hex SHA-256 over the ordered entries.
    #[must_use]
    pub(crate) fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.name.as_bytes());
            hasher.update([0]);
            hasher.update(entry.constraint.as_deref().unwrap_or_default().as_bytes());
            hasher.update([b'\n']);
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}
