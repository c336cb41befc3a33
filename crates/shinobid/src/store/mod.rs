//! SQLite persistence for characters and jutsus.
//!
//! A single connection is shared behind a mutex. Each operation holds the
//! lock only for the statements it issues, so HTTP handlers run store calls
//! on the blocking thread pool.

mod characters;
mod error;
mod jutsus;

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use shinobi_config::DatabaseLocation;
use tracing::info;

pub use error::StoreError;

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS characters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    village TEXT NOT NULL,
    rank TEXT
);
CREATE INDEX IF NOT EXISTS idx_characters_name ON characters(name);
CREATE TABLE IF NOT EXISTS jutsus (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    jutsu_type TEXT NOT NULL,
    chakra_cost INTEGER NOT NULL CHECK (chakra_cost >= 0),
    character_id INTEGER REFERENCES characters(id) ON DELETE SET NULL
);
CREATE INDEX IF NOT EXISTS idx_jutsus_name ON jutsus(name);
CREATE INDEX IF NOT EXISTS idx_jutsus_character_id ON jutsus(character_id);
";

/// Handle to the application database.
#[derive(Debug)]
pub struct Store {
    connection: Mutex<Connection>,
    location: DatabaseLocation,
}

impl Store {
    /// Opens (creating if needed) the database at `location`.
    pub fn open(location: &DatabaseLocation) -> Result<Self, StoreError> {
        let connection = match location {
            DatabaseLocation::Memory => Connection::open_in_memory(),
            DatabaseLocation::File(path) => Connection::open(path),
        }
        .map_err(|source| StoreError::Open {
            location: location.to_string(),
            source,
        })?;
        connection
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|source| StoreError::Open {
                location: location.to_string(),
                source,
            })?;
        info!(target: STORE_TARGET, database = %location, "database opened");
        Ok(Self {
            connection: Mutex::new(connection),
            location: location.clone(),
        })
    }

    /// Creates missing tables and indexes.
    pub fn migrate(&self) -> Result<(), StoreError> {
        self.lock()?
            .execute_batch(SCHEMA)
            .map_err(|source| StoreError::Migrate { source })?;
        info!(target: STORE_TARGET, database = %self.location, "database tables created");
        Ok(())
    }

    /// Runs a trivial query to prove the connection is usable.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.lock()?
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(StoreError::Query)
    }

    /// Closes the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<(), StoreError> {
        let connection = self
            .connection
            .into_inner()
            .map_err(|_| StoreError::Poisoned)?;
        connection
            .close()
            .map_err(|(_, source)| StoreError::Close { source })?;
        info!(target: STORE_TARGET, database = %self.location, "database connection closed");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Escapes `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`
/// pattern and wraps the term for substring matching.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
