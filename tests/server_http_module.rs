#![cfg(unix)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pi_remote::config::ServiceConfig;
use pi_remote::engine::InvocationEngine;
use pi_remote::server::{router, AppState};
use serde_json::{json, Value};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const API_KEY: &str = "test-key";

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn fixture() -> (TempDir, Router) {
    let dir = tempdir().expect("tempdir");
    write_script(&dir.path().join("hello.sh"), "#!/bin/sh\necho '  hello  '\n");
    write_script(&dir.path().join("echo.sh"), "#!/bin/sh\nprintf '%s' \"$1\"\n");
    write_script(&dir.path().join("fail.sh"), "#!/bin/sh\necho 'disk full' >&2\nexit 3\n");
    write_script(&dir.path().join("slow.sh"), "#!/bin/sh\nexec sleep 30\n");

    let mut config: ServiceConfig = serde_yaml::from_str(&format!(
        r#"
service:
  name: test-pi
  description: fixture service
  port: 5000
  api_key: {API_KEY}
functions:
  - id: hello
    name: Hello
    description: says hello
    script: hello.sh
  - id: echo
    name: Echo
    script: echo.sh
    return_format: json
    inputs:
      - name: pin
        type: number
        required: true
      - name: label
        type: string
  - id: fail
    name: Fail
    script: fail.sh
  - id: slow
    name: Slow
    script: slow.sh
    timeout: 1
"#
    ))
    .expect("parse config");
    config.resolve_script_paths(dir.path());
    config.validate().expect("valid config");

    let ServiceConfig { service, functions } = config;
    let state = Arc::new(AppState::new(service, InvocationEngine::new(functions)));
    (dir, router(state))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

fn get(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).expect("request")
}

fn call(function_id: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/call/{function_id}"))
        .header("X-API-Key", API_KEY)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn health_and_discover_need_no_key() {
    let (_dir, app) = fixture();

    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());

    let (status, body) = send(&app, get("/discover", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "test-pi");
    assert_eq!(body["description"], "fixture service");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn functions_listing_requires_the_api_key() {
    let (_dir, app) = fixture();

    let (status, body) = send(&app, get("/functions", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or missing API key");

    let (status, _) = send(&app, get("/functions", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, get("/functions", Some(API_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert_eq!(body["functions"][0]["id"], "hello");
    assert_eq!(body["functions"][0]["description"], "says hello");
    assert_eq!(
        body["functions"][1]["inputs"],
        json!([
            {"name": "pin", "type": "number", "required": true},
            {"name": "label", "type": "string", "required": false}
        ])
    );
    assert!(body["functions"][0].get("script").is_none());
}

#[tokio::test]
async fn call_requires_the_api_key() {
    let (_dir, app) = fixture();
    let request = Request::builder()
        .method("POST")
        .uri("/call/hello")
        .body(Body::empty())
        .expect("request");

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn call_without_body_runs_text_function() {
    let (_dir, app) = fixture();

    let (status, body) = send(&app, call("hello", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["function"], "hello");
    assert_eq!(body["result"], json!({"output": "hello"}));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn call_passes_params_to_json_function() {
    let (_dir, app) = fixture();

    let (status, body) = send(&app, call("echo", r#"{"pin": 17, "label": "porch"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({"label": "porch", "pin": 17}));
}

#[tokio::test]
async fn unknown_function_is_404() {
    let (_dir, app) = fixture();

    let (status, body) = send(&app, call("reboot", "{}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Function reboot not found");
}

#[tokio::test]
async fn invalid_input_is_400() {
    let (_dir, app) = fixture();

    let (status, body) = send(&app, call("echo", "{pin: 17")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON in request body");

    let (status, body) = send(&app, call("echo", "[17]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request body must be a JSON object");

    let (status, body) = send(&app, call("echo", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameter: pin");

    let (status, body) = send(&app, call("echo", r#"{"pin": "17"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Parameter pin must be a number");
}

#[tokio::test]
async fn failing_script_is_500_with_stderr() {
    let (_dir, app) = fixture();

    let (status, body) = send(&app, call("fail", "")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "Script failed with exit code 3: disk full");
}

#[tokio::test]
async fn slow_script_is_504() {
    let (_dir, app) = fixture();

    let (status, body) = send(&app, call("slow", "")).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "Function execution timed out");
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() {
    let (_dir, app) = fixture();
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header("Origin", "http://phone.local")
        .body(Body::empty())
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}
