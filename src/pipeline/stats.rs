use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use super::chunk::PcmFormat;
use super::state::SessionState;

/// Statistics about the current (or most recent) conversion session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Assigned when processing starts
    pub session_id: Option<String>,

    pub state: SessionState,

    /// Output PCM file
    pub output_path: Option<PathBuf>,

    pub format: Option<PcmFormat>,

    /// When processing started
    pub started_at: Option<DateTime<Utc>>,

    /// Chunks waiting in the queue right now
    pub queued: usize,

    /// Chunks accepted since the last clear
    pub chunks_enqueued: u64,

    /// Chunks decoded and appended
    pub chunks_converted: u64,

    /// Chunks lost to decode or persistence failures
    pub chunks_failed: u64,

    /// PCM bytes appended to the output file
    pub bytes_written: u64,
}

/// Counters shared between the pipeline handle and its worker
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub enqueued: AtomicU64,
    pub converted: AtomicU64,
    pub failed: AtomicU64,
    pub bytes_written: AtomicU64,
}

impl Counters {
    /// Reset the per-session enqueue sequence
    pub fn reset_enqueued(&self) {
        self.enqueued.store(0, Ordering::SeqCst);
    }

    /// Reset everything tied to the output file
    pub fn reset_output(&self) {
        self.converted.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.bytes_written.store(0, Ordering::SeqCst);
    }
}
