use super::chunk::{AudioChunk, ChunkPosition};
use super::header::HeaderCache;
use crate::error::Result;

/// Turn a chunk into a self-contained decodable unit
///
/// The first chunk already carries the container header and passes through
/// unchanged, capturing the header as a side effect. Every later chunk gets the
/// cached header prepended.
pub fn repair(chunk: AudioChunk, cache: &mut HeaderCache) -> Result<Vec<u8>> {
    match chunk.position {
        ChunkPosition::First => {
            cache.capture(&chunk.data)?;
            Ok(chunk.data)
        }
        ChunkPosition::Middle | ChunkPosition::Last => {
            cache.prepend(&chunk.data, &chunk.position.to_string())
        }
    }
}
