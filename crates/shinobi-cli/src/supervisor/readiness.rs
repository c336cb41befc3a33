//! Reads the health snapshot a worker writes into the runtime directory.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use super::SupervisorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WorkerStatus {
    Starting,
    Ready,
    Stopping,
}

/// Snapshot written by `shinobid`.
///
/// The recorded pid is ignored: the worker may run behind `cargo run`, so
/// freshness is judged by timestamp alone.
#[derive(Debug, Deserialize)]
struct HealthSnapshot {
    status: WorkerStatus,
    timestamp: u64,
}

/// Whether a snapshot written since `started_at` reports `ready`.
pub(crate) fn is_ready(path: &Path, started_at: SystemTime) -> Result<bool, SupervisorError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(SupervisorError::ReadHealth {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let snapshot: HealthSnapshot =
        serde_json::from_str(&text).map_err(|source| SupervisorError::ParseHealth {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(snapshot.status == WorkerStatus::Ready && snapshot.timestamp >= epoch_seconds(started_at))
}

fn epoch_seconds(instant: SystemTime) -> u64 {
    instant
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
