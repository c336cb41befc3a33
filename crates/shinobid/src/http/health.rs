//! Root, liveness and database health endpoints.

use std::sync::Mutex;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::{Value, json};
use sysinfo::System;
use tracing::warn;

use super::{AppState, HTTP_TARGET};
use crate::http::errors::ApiError;

/// Version reported by the root endpoint.
pub const API_VERSION: &str = "1.0.0";

/// Samples host CPU and memory utilisation.
#[derive(Debug)]
pub(crate) struct HostMetrics {
    system: Mutex<System>,
}

/// Utilisation percentages rounded to one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct HostSample {
    pub(crate) cpu_usage: f64,
    pub(crate) memory_usage: f64,
}

impl HostMetrics {
    pub(crate) fn new() -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first sample has a baseline.
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
        }
    }

    /// CPU usage since the previous sample and current memory usage.
    pub(crate) fn sample(&self) -> Option<HostSample> {
        let mut system = self.system.lock().ok()?;
        system.refresh_cpu_usage();
        system.refresh_memory();
        Some(HostSample {
            cpu_usage: round_tenths(f64::from(system.global_cpu_usage())),
            memory_usage: round_tenths(percentage(system.used_memory(), system.total_memory())),
        })
    }
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "memory sizes only need percent-level precision"
)]
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

#[expect(
    clippy::float_arithmetic,
    reason = "utilisation is reported as a fractional percentage"
)]
fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[expect(clippy::unused_async, reason = "axum handlers are async functions")]
pub(super) async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "app_name": &*state.app_name,
        "version": API_VERSION,
    }))
}

#[expect(clippy::unused_async, reason = "axum handlers are async functions")]
pub(super) async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let sample = state.metrics.sample().ok_or(ApiError::Unexpected)?;
    Ok(Json(json!({
        "status": "running",
        "system": sample,
    })))
}

pub(super) async fn database(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let outcome = state.run(|store| store.ping()).await?;
    Ok(Json(match outcome {
        Ok(()) => json!({ "status": "healthy", "database": "connected" }),
        Err(error) => {
            warn!(target: HTTP_TARGET, error = %error, "database health check failed");
            json!({ "status": "unhealthy", "database": error.to_string() })
        }
    }))
}
