use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::messages::{AudioBufferMessage, AudioFileBufferMessage, PcmMessage};
use super::recorder::{FileBufferOutcome, FileRecorder};
use crate::error::{PipelineError, Result};
use crate::pipeline::{ChunkPosition, ConversionPipeline, SessionState, SessionStats};

/// Ingestion entry point: maps positioned chunks onto pipeline calls
///
/// First clears the queue, enqueues and starts processing; Middle enqueues;
/// Last enqueues and waits for the drain to finish.
#[derive(Clone)]
pub struct AudioHub {
    pipeline: Arc<ConversionPipeline>,
    output_path: PathBuf,
    recorder: Option<Arc<FileRecorder>>,
}

impl AudioHub {
    pub fn new(pipeline: Arc<ConversionPipeline>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            output_path: output_path.into(),
            recorder: None,
        }
    }

    /// Enable whole-file uploads
    pub fn with_file_recorder(mut self, recorder: FileRecorder) -> Self {
        self.recorder = Some(Arc::new(recorder));
        self
    }

    pub fn pipeline(&self) -> &Arc<ConversionPipeline> {
        &self.pipeline
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    pub async fn process_audio_buffer(&self, msg: AudioBufferMessage) -> Result<SessionStats> {
        // Payload errors surface before anything is touched
        let chunk = msg.to_chunk()?;
        let format = msg.format();

        match chunk.position {
            ChunkPosition::First => {
                if self.pipeline.state() != SessionState::Idle {
                    warn!("New session started before the previous one stopped; draining it first");
                    self.pipeline.stop_processing().await?;
                }

                self.pipeline.clear_queue();
                self.pipeline.add_buffer(chunk)?;
                self.pipeline
                    .start_processing(&self.output_path, format)
                    .await?;
            }
            ChunkPosition::Middle => {
                self.pipeline.add_buffer(chunk)?;
            }
            ChunkPosition::Last => {
                self.pipeline.add_buffer(chunk)?;
                self.pipeline.stop_processing().await?;
                info!(
                    "Session complete, PCM written to {}",
                    self.output_path.display()
                );
            }
        }

        Ok(self.pipeline.stats())
    }

    /// Append one piece of a whole-file upload; the last piece converts it
    ///
    /// Independent of the chunk session: nothing is queued or repaired.
    pub async fn process_audio_file_buffer(
        &self,
        msg: AudioFileBufferMessage,
    ) -> Result<FileBufferOutcome> {
        let recorder = self
            .recorder
            .as_ref()
            .ok_or(PipelineError::FileIngestDisabled)?;
        let data = msg.to_bytes()?;

        recorder
            .write_buffer(&msg.file_name, &data, msg.position, msg.sample_rate)
            .await
    }

    /// Convert one chunk immediately without touching the session output
    pub async fn convert_now(&self, msg: AudioBufferMessage) -> Result<PcmMessage> {
        let chunk = msg.to_chunk()?;
        let format = msg.format();
        let pcm = self.pipeline.convert_buffer(chunk, format).await?;
        Ok(PcmMessage::new(&pcm, format))
    }
}
