use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::appender::OutputAppender;
use super::chunk::{PcmFormat, RepairedChunk};
use super::decoder::Decoder;
use super::queue::ChunkQueue;
use super::state::{PipelineEvent, SessionState};
use super::stats::Counters;

/// The single background loop of a session
///
/// Dequeues in FIFO order and runs decode then append for one chunk at a time.
/// Per-chunk failures are reported and the loop moves on.
pub(crate) struct ConversionWorker {
    pub queue: Arc<ChunkQueue>,
    pub decoder: Arc<dyn Decoder>,
    pub appender: OutputAppender,
    pub output_path: PathBuf,
    pub format: PcmFormat,
    pub poll_interval: Duration,
    pub state: Arc<watch::Sender<SessionState>>,
    pub events: broadcast::Sender<PipelineEvent>,
    pub counters: Arc<Counters>,
}

impl ConversionWorker {
    /// Spawn the loop under a supervisor that returns the session to Idle
    ///
    /// The Done → Idle transition belongs to the spawned task, not to whoever
    /// called stop, so a stop caller that goes away cannot strand the session.
    pub fn spawn(self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            if let Err(e) = tokio::spawn(self.run()).await {
                error!("Conversion worker panicked: {}", e);
            }

            let from = state.send_replace(SessionState::Idle);
            let _ = events.send(PipelineEvent::StateChanged {
                from,
                to: SessionState::Idle,
            });

            info!(
                "Conversion session stopped: {} converted, {} failed, {} bytes written",
                counters.converted.load(Ordering::SeqCst),
                counters.failed.load(Ordering::SeqCst),
                counters.bytes_written.load(Ordering::SeqCst)
            );
        })
    }

    async fn run(self) {
        info!(
            "Conversion worker started ({} decoder → {})",
            self.decoder.name(),
            self.output_path.display()
        );

        loop {
            // Read the state before dequeuing: once Draining is seen, the next
            // empty observation ends the loop.
            let draining = *self.state.borrow() == SessionState::Draining;

            match self.queue.try_dequeue() {
                Some(chunk) => self.convert(chunk).await,
                None if draining => break,
                None => {
                    tokio::select! {
                        _ = self.queue.notified() => {}
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }

        let from = self.state.send_replace(SessionState::Done);
        let _ = self.events.send(PipelineEvent::StateChanged {
            from,
            to: SessionState::Done,
        });
        debug!("Conversion worker drained its queue");
    }

    async fn convert(&self, chunk: RepairedChunk) {
        let sequence = chunk.sequence;

        let pcm = match self.decoder.decode(&chunk.data, self.format).await {
            Ok(pcm) => pcm,
            Err(e) => {
                error!("Failed to decode chunk {} ({}): {}", sequence, chunk.position, e);
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                let _ = self.events.send(PipelineEvent::DecodeFailed {
                    sequence,
                    error: e.to_string(),
                });
                return;
            }
        };

        match self.appender.append(&self.output_path, &pcm).await {
            Ok(attempts) => {
                // Only this worker writes the file, so the running total is the offset
                let offset = self
                    .counters
                    .bytes_written
                    .fetch_add(pcm.len() as u64, Ordering::SeqCst);
                self.counters.converted.fetch_add(1, Ordering::SeqCst);

                debug!(
                    "Chunk {} appended: {} bytes at offset {}",
                    sequence,
                    pcm.len(),
                    offset
                );

                let _ = self.events.send(PipelineEvent::ChunkConverted {
                    sequence,
                    offset,
                    len: pcm.len(),
                    attempts,
                });
            }
            Err(e) => {
                error!("Failed to persist chunk {}: {}", sequence, e);
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                let _ = self.events.send(PipelineEvent::PersistenceFailed {
                    sequence,
                    attempts: self.appender.policy().attempts.max(1),
                    error: e.to_string(),
                });
            }
        }
    }
}
