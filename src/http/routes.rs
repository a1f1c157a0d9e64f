use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Chunk ingestion
        .route("/audio/buffer", post(handlers::process_audio_buffer))
        .route("/audio/convert", post(handlers::convert_audio_buffer))
        .route("/audio/file", post(handlers::process_audio_file))
        // Session queries
        .route("/audio/status", get(handlers::get_status))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
