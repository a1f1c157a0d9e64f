use super::state::AppState;
use crate::error::{ErrorKind, PipelineError};
use crate::transport::{AudioBufferMessage, AudioFileBufferMessage};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

fn error_response(e: PipelineError) -> Response {
    let (status, kind) = match e.kind() {
        ErrorKind::Transport => (StatusCode::BAD_REQUEST, "transport"),
        ErrorKind::State => (StatusCode::CONFLICT, "state"),
        ErrorKind::Decode => (StatusCode::INTERNAL_SERVER_ERROR, "decode"),
        ErrorKind::Persistence => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
        ErrorKind::Io => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
    };

    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            kind: kind.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /audio/buffer
/// Add one chunk to the current session
pub async fn process_audio_buffer(
    State(state): State<AppState>,
    Json(msg): Json<AudioBufferMessage>,
) -> impl IntoResponse {
    debug!(
        "Received {} buffer ({} base64 chars)",
        msg.position,
        msg.buffer.len()
    );

    match state.hub.process_audio_buffer(msg).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /audio/convert
/// Convert one chunk immediately and return the PCM
pub async fn convert_audio_buffer(
    State(state): State<AppState>,
    Json(msg): Json<AudioBufferMessage>,
) -> impl IntoResponse {
    match state.hub.convert_now(msg).await {
        Ok(pcm) => (StatusCode::OK, Json(pcm)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /audio/file
/// Append one piece of a whole-file upload; the last piece converts it to WAV
pub async fn process_audio_file(
    State(state): State<AppState>,
    Json(msg): Json<AudioFileBufferMessage>,
) -> impl IntoResponse {
    debug!("Received {} piece of {}", msg.position, msg.file_name);

    match state.hub.process_audio_file_buffer(msg).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /audio/status
/// Get statistics for the current session
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.hub.pipeline().stats()))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
