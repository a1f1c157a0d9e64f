use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::{AudioChunk, ChunkPosition, PcmFormat};

/// One chunk as delivered by the capture client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioBufferMessage {
    pub buffer: String,  // Base64-encoded chunk bytes
    pub position: ChunkPosition,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBufferMessage {
    pub fn new(data: &[u8], position: ChunkPosition, format: PcmFormat) -> Self {
        Self {
            buffer: base64::engine::general_purpose::STANDARD.encode(data),
            position,
            sample_rate: format.sample_rate,
            channels: format.channels,
        }
    }

    /// Decode the payload; malformed base64 is a transport error
    pub fn to_chunk(&self) -> Result<AudioChunk> {
        let data = base64::engine::general_purpose::STANDARD.decode(self.buffer.trim())?;
        Ok(AudioChunk::new(self.position, data))
    }

    pub fn format(&self) -> PcmFormat {
        PcmFormat::new(self.sample_rate, self.channels)
    }
}

/// One piece of a whole-file upload
///
/// Pieces are appended to `file_name` as raw bytes; nothing is repaired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFileBufferMessage {
    pub file_name: String,
    pub buffer: String,  // Base64-encoded file bytes
    pub position: ChunkPosition,
    pub sample_rate: u32,
}

impl AudioFileBufferMessage {
    pub fn new(
        file_name: impl Into<String>,
        data: &[u8],
        position: ChunkPosition,
        sample_rate: u32,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            buffer: base64::engine::general_purpose::STANDARD.encode(data),
            position,
            sample_rate,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(base64::engine::general_purpose::STANDARD.decode(self.buffer.trim())?)
    }
}

/// Result of an on-demand conversion
#[derive(Debug, Serialize, Deserialize)]
pub struct PcmMessage {
    pub pcm: String,  // Base64-encoded s16le PCM
    pub bytes: usize,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmMessage {
    pub fn new(pcm: &[u8], format: PcmFormat) -> Self {
        Self {
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm),
            bytes: pcm.len(),
            sample_rate: format.sample_rate,
            channels: format.channels,
        }
    }
}
