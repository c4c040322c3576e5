//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/v1/files` - Upload, list, inspect, download and delete files
//! - `/v1/files/generate` - Generate a file with an LLM provider and store it
//! - `/api/health` - Health checks

pub mod files;
pub mod generate;
pub mod health;

use axum::Router;
use tracing::info;

use crate::middleware::{apply_catch_panic, apply_cors, apply_request_logging};
use crate::models::AppState;

/// Create the main application router
///
/// Layers apply innermost first: panics are caught before request logging
/// sees the response, and CORS wraps everything.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let allowed_origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(files::router(state.clone()))
        .merge(generate::router(state.clone()))
        .merge(health::router(state));

    let router = apply_catch_panic(router);
    let router = apply_request_logging(router);
    apply_cors(router, &allowed_origins)
}
