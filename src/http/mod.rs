//! HTTP API for the capture client
//!
//! This module exposes the ingestion hub over REST:
//! - POST /audio/buffer - Add a positioned chunk (first/middle/last)
//! - POST /audio/convert - Convert one chunk immediately and return PCM
//! - POST /audio/file - Upload a whole file in pieces, converted to WAV on the last
//! - GET /audio/status - Query session statistics
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
