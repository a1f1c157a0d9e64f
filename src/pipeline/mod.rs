//! Chunk reassembly and PCM conversion
//!
//! This module provides the `ConversionPipeline` that manages:
//! - A FIFO of chunks fed by the ingestion side
//! - Session header capture and per-chunk header repair
//! - Decoding each repaired chunk to s16le PCM through a `Decoder`
//! - Appending PCM to the session output file with bounded retry
//! - The single background worker and its start/stop lifecycle

mod appender;
mod chunk;
mod config;
mod converter;
mod decoder;
mod header;
mod queue;
mod repair;
mod state;
mod stats;
mod worker;

pub use appender::{FileOutputWriter, OutputAppender, OutputWriter, RetryPolicy};
pub use chunk::{AudioChunk, ChunkPosition, PcmFormat, RepairedChunk};
pub use config::PipelineConfig;
pub use converter::ConversionPipeline;
pub use decoder::{Decoder, FfmpegDecoder};
pub use header::{HeaderCache, DEFAULT_HEADER_LEN};
pub use queue::ChunkQueue;
pub use repair::repair;
pub use state::{PipelineEvent, SessionState};
pub use stats::SessionStats;
