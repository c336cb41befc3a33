//! Install receipt gating `shinobi run`.
//!
//! The receipt is written only after an install finished without error and
//! is removed before each install starts, so its presence always means the
//! environment matched the recorded manifests at some point.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::manifest::Manifest;

const RECEIPT_PATH: [&str; 3] = ["target", "shinobi", "install.json"];

/// Errors raised while reading or writing the receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Filesystem access failed.
    #[error("failed to access install receipt {path:?}: {source}")]
    Io {
        /// Receipt path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The receipt is not valid JSON.
    #[error("install receipt {path:?} is corrupt: {source}")]
    Corrupt {
        /// Receipt path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The receipt could not be serialised.
    #[error("failed to serialise install receipt: {0}")]
    Serialise(#[source] serde_json::Error),
    /// The current time could not be formatted.
    #[error("failed to format install timestamp: {0}")]
    Timestamp(#[source] time::error::Format),
}

/// Which manifests an install covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum InstallProfile {
    Runtime,
    Development,
}

impl fmt::Display for InstallProfile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Runtime => "runtime",
            Self::Development => "development",
        })
    }
}

/// Proof of a completed install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct InstallReceipt {
    pub(crate) profile: InstallProfile,
    pub(crate) runtime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) development: Option<String>,
    pub(crate) installed_at: String,
}

impl InstallReceipt {
    /// Records the manifests just installed, stamped with the current time.
    pub(crate) fn new(
        profile: InstallProfile,
        runtime: &Manifest,
        development: Option<&Manifest>,
    ) -> Result<Self, ReceiptError> {
        let installed_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(ReceiptError::Timestamp)?;
        Ok(Self {
            profile,
            runtime: runtime.fingerprint(),
            development: development.map(Manifest::fingerprint),
            installed_at,
        })
    }

    /// Whether the receipt still describes the given manifests.
    ///
    /// Runtime installs ignore the development manifest.
    #[must_use]
    pub(crate) fn is_current(&self, runtime: &Manifest, development: &Manifest) -> bool {
        if self.runtime != runtime.fingerprint() {
            return false;
        }
        match self.profile {
            InstallProfile::Runtime => true,
            InstallProfile::Development => {
                self.development.as_deref() == Some(development.fingerprint().as_str())
            }
        }
    }
}

/// Location of the receipt under `root`.
#[must_use]
pub(crate) fn receipt_path(root: &Path) -> PathBuf {
    RECEIPT_PATH.iter().fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Reads the receipt, returning `None` when no install has completed.
pub(crate) fn read(root: &Path) -> Result<Option<InstallReceipt>, ReceiptError> {
    let path = receipt_path(root);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ReceiptError::Io { path, source }),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| ReceiptError::Corrupt { path, source })
}

/// Persists `receipt`, creating `target/shinobi` as needed.
pub(crate) fn write(root: &Path, receipt: &InstallReceipt) -> Result<(), ReceiptError> {
    let path = receipt_path(root);
    let io_error = |source| ReceiptError::Io {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut json = serde_json::to_vec_pretty(receipt).map_err(ReceiptError::Serialise)?;
    json.push(b'\n');
    fs::write(&path, json).map_err(io_error)
}

/// Deletes the receipt; a missing receipt is not an error.
pub(crate) fn remove(root: &Path) -> Result<(), ReceiptError> {
    let path = receipt_path(root);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ReceiptError::Io { path, source }),
    }
}
