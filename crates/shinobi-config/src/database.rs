//! Parsing of the `database_url` setting.
//!
//! Only SQLite is supported. Accepted spellings:
//!
//! - `sqlite::memory:` or `sqlite://:memory:` for a private in-memory database;
//! - `sqlite://relative/or/absolute.db` or `sqlite:path.db` for a file.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

const SCHEME: &str = "sqlite:";
const MEMORY: &str = ":memory:";

/// Where the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Volatile database that disappears with the connection.
    Memory,
    /// SQLite file on disk, created if missing.
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parses a `sqlite:` URL into a location.
    pub fn parse(url: &str) -> Result<Self, DatabaseUrlError> {
        let trimmed = url.trim();
        let Some(rest) = trimmed.strip_prefix(SCHEME) else {
            return Err(DatabaseUrlError::UnsupportedScheme {
                url: trimmed.to_owned(),
            });
        };
        let path = rest.strip_prefix("//").unwrap_or(rest);
        if path.is_empty() {
            return Err(DatabaseUrlError::MissingPath {
                url: trimmed.to_owned(),
            });
        }
        if path == MEMORY || rest == MEMORY {
            return Ok(Self::Memory);
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

impl fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("sqlite::memory:"),
            Self::File(path) => write!(f, "sqlite://{}", path.display()),
        }
    }
}

/// Errors raised while interpreting `database_url`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DatabaseUrlError {
    /// The URL does not use the `sqlite:` scheme.
    #[error("unsupported database url '{url}': only sqlite: urls are accepted")]
    UnsupportedScheme {
        /// Offending URL.
        url: String,
    },
    /// The URL names no database file.
    #[error("database url '{url}' does not name a database file")]
    MissingPath {
        /// Offending URL.
        url: String,
    },
}
