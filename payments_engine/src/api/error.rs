use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::error::DomainError;

/// Error envelope (spec.md §6): `{error, code, details?}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub details: Option<String>,
}

/// Wraps a `DomainError` so it can be returned directly as an axum handler
/// error, mirroring the teacher's `ApiError(pub TransactionError)`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.kind();
        let status = status_for_kind(code);
        let body = ErrorBody {
            error: self.0.to_string(),
            code: code.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

/// spec.md §7's kind-to-HTTP-status mapping table.
fn status_for_kind(kind: &str) -> StatusCode {
    match kind {
        "validation_error" | "invalid_id" | "invalid_currency" => StatusCode::BAD_REQUEST,
        "not_found" => StatusCode::NOT_FOUND,
        "duplicate_request" | "invalid_state_transition" | "conflict" => StatusCode::CONFLICT,
        "insufficient_funds" | "account_inactive" | "max_retries_exceeded" | "domain_error" => StatusCode::UNPROCESSABLE_ENTITY,
        "provider_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
