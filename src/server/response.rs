use crate::engine::InvocationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Invocation(InvocationError),
}

impl From<InvocationError> for ApiError {
    fn from(value: InvocationError) -> Self {
        Self::Invocation(value)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Invocation(err) => match err {
                InvocationError::NotFound { .. } => StatusCode::NOT_FOUND,
                InvocationError::InvalidParams(_) | InvocationError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                InvocationError::ExecutionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                InvocationError::ExecutionFailed { .. } | InvocationError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized => "Invalid or missing API key".to_string(),
            Self::Invocation(InvocationError::Internal(_)) => "Internal server error".to_string(),
            Self::Invocation(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Invocation(InvocationError::Internal(detail)) = &self {
            error!(detail = %detail, "internal error while handling request");
        }
        let body = json!({
            "status": "error",
            "error": self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}
