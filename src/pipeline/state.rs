use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the conversion worker
///
/// Idle → Working (start) → Draining (stop) → Done (worker exits) → Idle (session closed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No background loop running
    Idle,
    /// Loop is dequeuing and converting
    Working,
    /// Stop requested; loop runs until the queue is observed empty
    Draining,
    /// Loop has exited
    Done,
}

impl SessionState {
    /// Whether a worker loop is (or is about to be) running
    pub fn is_active(self) -> bool {
        matches!(self, Self::Working | Self::Draining)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Working => "working",
            Self::Draining => "draining",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Observable status of the background worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// PCM for a chunk was appended at `offset` in the output file
    ChunkConverted {
        sequence: u64,
        offset: u64,
        len: usize,
        attempts: u32,
    },
    DecodeFailed {
        sequence: u64,
        error: String,
    },
    PersistenceFailed {
        sequence: u64,
        attempts: u32,
        error: String,
    },
}
