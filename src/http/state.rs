use crate::transport::AudioHub;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Ingestion hub wrapping the process-wide conversion pipeline
    pub hub: AudioHub,
}

impl AppState {
    pub fn new(hub: AudioHub) -> Self {
        Self { hub }
    }
}
