//! Status API for the access controller
//!
//! Read-only HTTP surface: a health check, channel/counter status for
//! the dashboard, and the SSE event stream. Nothing here mutates the
//! decision pipeline; readers are controlled only over their serial
//! channels.

pub mod events;
pub mod status;

use crate::state::SharedState;
use axum::{response::Json, routing::get, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status::full_status))
        .route("/events", get(events::event_stream))
        .with_state(state)
        // Dashboard is served from another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "gatehouse-ac",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
