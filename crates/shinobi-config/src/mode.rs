//! Server operating modes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the server process is expected to behave once launched.
///
/// Production binds every interface, never runs as root, and never reloads.
/// Development binds the loopback interface and expects an external
/// supervisor to restart it when sources change.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ServerMode {
    /// Hardened, long-running deployment.
    #[default]
    Production,
    /// Local inner-loop development.
    Development,
}

impl ServerMode {
    /// Returns `true` when the process must refuse to keep root privileges.
    #[must_use]
    pub const fn forbids_root(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Errors encountered while parsing a [`ServerMode`] from text.
pub type ServerModeParseError = strum::ParseError;
