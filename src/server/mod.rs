use crate::config::ServiceSection;
use crate::engine::InvocationEngine;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub mod auth;
pub mod handlers;
pub mod response;

pub use auth::{is_authorized, API_KEY_HEADER};
pub use response::ApiError;

#[derive(Debug)]
pub struct AppState {
    pub service: ServiceSection,
    pub engine: InvocationEngine,
}

impl AppState {
    pub fn new(service: ServiceSection, engine: InvocationEngine) -> Self {
        Self { service, engine }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/functions", get(handlers::list_functions))
        .route("/call/:function_id", post(handlers::call_function))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_api_key,
        ));

    Router::new()
        .route("/discover", get(handlers::discover))
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
