use crate::config::InputSpec;
use crate::engine::{InvocationError, ParamBundle};
use crate::server::{ApiError, AppState};
use crate::shared::now_iso8601;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
struct FunctionSummary<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    inputs: &'a [InputSpec],
}

pub async fn discover(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "name": state.service.name,
        "description": state.service.description,
        "version": SERVICE_VERSION,
        "timestamp": now_iso8601(),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": now_iso8601(),
    }))
}

pub async fn list_functions(State(state): State<Arc<AppState>>) -> Json<Value> {
    let functions = state
        .engine
        .functions()
        .iter()
        .map(|spec| FunctionSummary {
            id: &spec.id,
            name: &spec.name,
            description: &spec.description,
            inputs: &spec.inputs,
        })
        .collect::<Vec<_>>();
    Json(json!({
        "count": functions.len(),
        "functions": functions,
    }))
}

pub async fn call_function(
    State(state): State<Arc<AppState>>,
    Path(function_id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    state.engine.lookup(&function_id)?;
    let params = parse_params(&body)?;

    let worker_state = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || {
        worker_state.engine.invoke(&function_id, &params)
    })
    .await
    .map_err(|err| {
        error!(error = %err, "invocation task failed");
        InvocationError::Internal(err.to_string())
    })??;

    Ok(Json(json!({
        "status": "success",
        "function": outcome.function_id,
        "result": outcome.payload,
        "timestamp": outcome.timestamp,
    })))
}

pub fn parse_params(body: &[u8]) -> Result<ParamBundle, InvocationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ParamBundle::new());
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| InvocationError::InvalidRequest("Invalid JSON in request body".to_string()))?;
    ParamBundle::from_json(value)
}

#[cfg(test)]
mod tests {
    use super::parse_params;

    #[test]
    fn empty_or_blank_body_is_an_empty_bundle() {
        assert!(parse_params(b"").expect("empty").is_empty());
        assert!(parse_params(b"  \n").expect("blank").is_empty());
        assert!(parse_params(b"null").expect("null").is_empty());
    }

    #[test]
    fn malformed_body_is_rejected() {
        let err = parse_params(b"{pin: 4").expect_err("bad json");
        assert_eq!(err.to_string(), "Invalid JSON in request body");

        let err = parse_params(b"\"pin\"").expect_err("not an object");
        assert_eq!(err.to_string(), "Request body must be a JSON object");
    }

    #[test]
    fn object_body_becomes_the_bundle() {
        let bundle = parse_params(br#"{"pin": 4, "on": true}"#).expect("object");
        assert_eq!(bundle.len(), 2);
    }
}
