use thiserror::Error;

/// Errors surfaced by [`super::Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened or configured.
    #[error("failed to open database {location}: {source}")]
    Open {
        /// Database that failed to open.
        location: String,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating tables failed.
    #[error("failed to create database tables: {source}")]
    Migrate {
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// A statement failed.
    #[error("database query failed: {0}")]
    Query(#[source] rusqlite::Error),
    /// A referenced character does not exist.
    #[error("character {id} does not exist")]
    MissingCharacter {
        /// Referenced identifier.
        id: i64,
    },
    /// Closing the connection failed.
    #[error("failed to close database: {source}")]
    Close {
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// A thread panicked while holding the connection.
    #[error("database connection lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(source: rusqlite::Error) -> Self {
        Self::Query(source)
    }
}
