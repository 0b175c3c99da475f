use crate::server::{ApiError, AppState};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "x-api-key";

pub fn is_authorized(header_value: Option<&str>, expected_key: &str) -> bool {
    let Some(provided) = header_value else {
        return false;
    };
    if provided.is_empty() || expected_key.is_empty() {
        return false;
    }
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected_key.as_bytes())
}

pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if !is_authorized(provided, &state.service.api_key) {
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}
