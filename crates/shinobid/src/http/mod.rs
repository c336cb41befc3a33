//! HTTP surface of the registry service.
//!
//! The router exposes the root and health endpoints at the top level and the
//! character and jutsu resources under the configured API prefix. Store calls
//! are synchronous, so handlers hop onto the blocking pool through
//! [`AppState::run`].

mod characters;
mod context;
mod errors;
mod health;
mod jutsus;
mod middleware;

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::routing::{get, post};
use serde_json::Value;
use tracing::error;

use crate::domain::{FieldError, FromJsonBody, ValidationErrors};
use crate::store::{Store, StoreError};

pub use errors::ApiError;
pub use health::API_VERSION;
pub use middleware::REQUEST_ID_HEADER;

use health::HostMetrics;

pub(crate) const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    metrics: Arc<HostMetrics>,
    app_name: Arc<str>,
}

impl AppState {
    /// Builds handler state around an opened store.
    #[must_use]
    pub fn new(store: Arc<Store>, app_name: &str) -> Self {
        Self {
            store,
            metrics: Arc::new(HostMetrics::new()),
            app_name: Arc::from(app_name),
        }
    }

    /// Runs a store operation on the blocking thread pool.
    pub(crate) async fn run<T, F>(&self, operation: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Store) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || operation(&store))
            .await
            .map_err(|join_error| {
                error!(target: HTTP_TARGET, error = %join_error, "store task failed");
                ApiError::Unexpected
            })
    }
}

/// Builds the application router.
///
/// An empty `api_prefix` mounts the resources at the root.
#[must_use]
pub fn router(state: AppState, api_prefix: &str) -> Router {
    let api = Router::new()
        .route("/characters", get(characters::list).post(characters::create))
        .route("/characters/", get(characters::list).post(characters::create))
        .route(
            "/characters/:id",
            get(characters::show)
                .patch(characters::update)
                .delete(characters::remove),
        )
        .route("/characters/:id/jutsus", post(characters::add_jutsu))
        .route("/jutsus", get(jutsus::list).post(jutsus::create))
        .route("/jutsus/", get(jutsus::list).post(jutsus::create))
        .route(
            "/jutsus/:id",
            get(jutsus::show).patch(jutsus::update).delete(jutsus::remove),
        );

    let base = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/db", get(health::database));

    let routed = if api_prefix.is_empty() {
        base.merge(api)
    } else {
        base.nest(api_prefix, api)
    };

    routed
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::request_context))
        .with_state(state)
}

#[expect(clippy::unused_async, reason = "axum handlers are async functions")]
async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

/// Decodes a JSON request body and validates it.
pub(crate) fn parse_body<T: FromJsonBody>(body: &Bytes) -> Result<T, ValidationErrors> {
    if body.is_empty() {
        return Err(ValidationErrors::single(FieldError::missing("body")));
    }
    let value: Value = serde_json::from_slice(body).map_err(|_| {
        ValidationErrors::single(FieldError::new("body", "JSON decode error", "json_invalid"))
    })?;
    T::from_json(&value)
}

/// Logs a store failure and yields the client-facing error.
pub(crate) fn store_failure(error: &StoreError, response: ApiError) -> ApiError {
    error!(target: HTTP_TARGET, error = %error, "store operation failed");
    response
}
