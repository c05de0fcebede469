//! HTTP API
//!
//! Handlers and router assembly

pub mod health;
pub mod project;

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(project::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
