pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod transport;

pub use config::Config;
pub use error::{ErrorKind, PipelineError};
pub use http::{create_router, AppState};
pub use pipeline::{
    AudioChunk, ChunkPosition, ConversionPipeline, Decoder, FfmpegDecoder, PcmFormat,
    PipelineConfig, PipelineEvent, RetryPolicy, SessionState, SessionStats,
};
pub use transport::{
    AudioBufferMessage, AudioFileBufferMessage, AudioHub, FileBufferOutcome, FileRecorder,
    PcmMessage,
};
