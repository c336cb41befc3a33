//! Request tracing, request ids and CORS.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD, HeaderMap, ORIGIN, VARY,
};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{Instrument, info};

use super::HTTP_TARGET;
use super::context::{self, RequestContext};

/// Header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const ALLOWED_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";
const PREFLIGHT_MAX_AGE: &str = "600";

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) async fn request_context(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let headers = request.headers();
    let supplied_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let request_id = supplied_id.clone().unwrap_or_else(generate_request_id);
    let origin = headers.get(ORIGIN).cloned();
    let requested_headers = headers.get(ACCESS_CONTROL_REQUEST_HEADERS).cloned();
    let preflight = method == Method::OPTIONS && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD);

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %path,
    );

    let mut response = if preflight {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let context = RequestContext {
            request_id: supplied_id,
            path,
        };
        context::scope(context, next.run(request))
            .instrument(span.clone())
            .await
    };

    let response_headers = response.headers_mut();
    apply_cors(response_headers, origin, requested_headers, preflight);
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response_headers.insert(REQUEST_ID_HEADER, value);
    }

    span.in_scope(|| {
        info!(
            target: HTTP_TARGET,
            status = response.status().as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
    });
    response
}

fn apply_cors(
    headers: &mut HeaderMap,
    origin: Option<HeaderValue>,
    requested_headers: Option<HeaderValue>,
    preflight: bool,
) {
    // Credentialed requests cannot use the `*` wildcard, so echo the origin.
    let allow_origin = origin.unwrap_or_else(|| HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));
    if preflight {
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            requested_headers.unwrap_or_else(|| HeaderValue::from_static("*")),
        );
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
    }
}

fn generate_request_id() -> String {
    let sequence = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or_default();
    format!("{:08x}-{sequence:08x}-{:05x}", nanos, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let first = generate_request_id();
        let second = generate_request_id();
        assert_ne!(first, second);
    }

    #[test]
    fn preflight_adds_method_and_header_grants() {
        let mut headers = HeaderMap::new();
        apply_cors(
            &mut headers,
            Some(HeaderValue::from_static("https://konoha.example")),
            Some(HeaderValue::from_static("content-type")),
            true,
        );
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://konoha.example");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
    }

    #[test]
    fn simple_requests_default_to_wildcard_origin() {
        let mut headers = HeaderMap::new();
        apply_cors(&mut headers, None, None, false);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!headers.contains_key(ACCESS_CONTROL_ALLOW_METHODS));
    }
}
