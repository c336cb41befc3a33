//! Logging preferences shared by every Shinobi binary.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Line format emitted by the tracing subscriber.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event.
    #[default]
    Json,
    /// Single-line human readable output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Borrowed view of the logging section of a [`crate::Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings<'a> {
    /// `EnvFilter` directive string, for example `info,shinobid=debug`.
    pub filter: &'a str,
    /// Output format.
    pub format: LogFormat,
}
