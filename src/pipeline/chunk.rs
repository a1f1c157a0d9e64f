use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a chunk sits in the captured stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkPosition {
    /// Carries the container header
    First,
    Middle,
    /// Final chunk of the session
    Last,
}

impl fmt::Display for ChunkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Middle => write!(f, "middle"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// One fragment of the captured stream, as delivered by the ingestion side
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub position: ChunkPosition,
    pub data: Vec<u8>,
}

impl AudioChunk {
    pub fn new(position: ChunkPosition, data: impl Into<Vec<u8>>) -> Self {
        Self {
            position,
            data: data.into(),
        }
    }

    pub fn first(data: impl Into<Vec<u8>>) -> Self {
        Self::new(ChunkPosition::First, data)
    }

    pub fn middle(data: impl Into<Vec<u8>>) -> Self {
        Self::new(ChunkPosition::Middle, data)
    }

    pub fn last(data: impl Into<Vec<u8>>) -> Self {
        Self::new(ChunkPosition::Last, data)
    }
}

/// A chunk that can be decoded on its own
#[derive(Debug, Clone)]
pub struct RepairedChunk {
    /// Enqueue order within the session (0-indexed)
    pub sequence: u64,
    pub position: ChunkPosition,
    pub data: Vec<u8>,
}

/// Target PCM format (always signed 16-bit little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}
