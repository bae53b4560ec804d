//! Plank server library logic.
//!
//! Wires the board patch API, the persistence layer, and the subscription
//! broker into an axum application exposing a health check and the
//! WebSocket session endpoint.

pub mod api_ws;
pub mod broker;
pub mod config;
pub mod documents;

use std::sync::Arc;

use axum::{routing::get, Extension, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

pub use broker::{Broker, ConnectionId};
pub use documents::{DocumentService, ServiceError};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Document service: patch serialization, persistence, and broadcast.
    pub documents: DocumentService,
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by load balancers,
/// monitoring, and CI to verify the server is running.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(api_ws::ws_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
