use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::domain::entities::IdempotencyRecord;
use crate::domain::types::IdempotencyKey;

use super::http_routes::AppState;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";
const REPLAYED_HEADER: &str = "x-idempotency-replayed";
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Caches the response for `POST /payments` and `POST /transfers` against
/// the client-supplied `Idempotency-Key` for 24h (spec.md §6, §4.15).
/// Requests with no such header pass through untouched.
pub async fn idempotency_middleware(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let Some(raw_key) = request.headers().get(IDEMPOTENCY_HEADER).and_then(|v| v.to_str().ok()) else {
        return next.run(request).await;
    };
    let key = IdempotencyKey(raw_key.to_string());

    match state.idempotency_repo.get(&key).await {
        Ok(Some(record)) if !record.is_expired(chrono::Utc::now()) => {
            let status = StatusCode::from_u16(record.response_status()).unwrap_or(StatusCode::OK);
            let mut response = (status, record.response_body().to_vec()).into_response();
            response.headers_mut().insert(REPLAYED_HEADER, HeaderValue::from_static("true"));
            return response;
        }
        Ok(_) => {}
        Err(err) => error!(error = %err, "idempotency lookup failed, proceeding uncached"),
    }

    let response = next.run(request).await;
    let status = response.status();
    let (parts, body) = response.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(error = %err, "failed to buffer response body for idempotency caching");
            return Response::from_parts(parts, Body::empty());
        }
    };

    if status.is_success() {
        match IdempotencyRecord::new(key, status.as_u16(), bytes.to_vec()) {
            Ok(record) => {
                if let Err(err) = state.idempotency_repo.set(record).await {
                    error!(error = %err, "failed to persist idempotency record");
                }
            }
            Err(err) => error!(error = %err, "refused to cache oversized idempotency response"),
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}
