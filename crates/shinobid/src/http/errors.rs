//! Error envelopes returned by the HTTP API.

use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use crate::domain::{FieldError, ValidationErrors};

use super::context;

const UNEXPECTED_DETAIL: &str = "An unexpected error occurred.";

/// Failure produced by a handler.
#[derive(Debug)]
pub enum ApiError {
    /// Request input was rejected (422).
    Validation(ValidationErrors),
    /// A client or server error with a fixed detail message.
    Status {
        /// Response status.
        status: StatusCode,
        /// Message placed in the `detail` field.
        detail: Cow<'static, str>,
    },
    /// An internal fault that must not leak details to the client.
    Unexpected,
}

impl ApiError {
    /// 404 with `detail`.
    #[must_use]
    pub const fn not_found(detail: &'static str) -> Self {
        Self::Status {
            status: StatusCode::NOT_FOUND,
            detail: Cow::Borrowed(detail),
        }
    }

    /// 400 with `detail`.
    #[must_use]
    pub const fn bad_request(detail: &'static str) -> Self {
        Self::Status {
            status: StatusCode::BAD_REQUEST,
            detail: Cow::Borrowed(detail),
        }
    }

    /// 500 with `detail`.
    #[must_use]
    pub const fn internal(detail: &'static str) -> Self {
        Self::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: Cow::Borrowed(detail),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[derive(Serialize)]
struct ValidationBody<'a> {
    success: bool,
    message: &'static str,
    errors: &'a [FieldError],
    path: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request = context::current();
        match self {
            Self::Validation(errors) => {
                let body = ValidationBody {
                    success: false,
                    message: "Validation error",
                    errors: errors.errors(),
                    path: request.path,
                };
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            Self::Status { status, detail } => (
                status,
                Json(json!({ "detail": detail, "request_id": request.request_id })),
            )
                .into_response(),
            Self::Unexpected => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": UNEXPECTED_DETAIL, "request_id": request.request_id })),
            )
                .into_response(),
        }
    }
}
