use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use super::appender::{FileOutputWriter, OutputAppender, OutputWriter};
use super::chunk::{AudioChunk, ChunkPosition, PcmFormat, RepairedChunk};
use super::config::PipelineConfig;
use super::decoder::Decoder;
use super::header::HeaderCache;
use super::queue::ChunkQueue;
use super::repair::repair;
use super::state::{PipelineEvent, SessionState};
use super::stats::{Counters, SessionStats};
use super::worker::ConversionWorker;
use crate::error::{PipelineError, Result};

/// Where and how the running session writes its output
#[derive(Debug, Clone)]
struct SessionInfo {
    id: String,
    output_path: PathBuf,
    format: PcmFormat,
    started_at: DateTime<Utc>,
}

/// Chunk reassembly and PCM conversion pipeline
///
/// The ingestion side calls `clear_queue` / `add_buffer` / `start_processing` /
/// `stop_processing`. Chunks are repaired as they are enqueued, so every chunk
/// the worker dequeues decodes on its own. At most one worker runs at a time.
pub struct ConversionPipeline {
    config: PipelineConfig,
    decoder: Arc<dyn Decoder>,
    appender: OutputAppender,

    queue: Arc<ChunkQueue>,

    /// Header for queued chunks; also serializes enqueue order
    header: Mutex<HeaderCache>,

    /// Independent header for `convert_buffer`
    on_demand_header: Mutex<HeaderCache>,

    state: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<PipelineEvent>,
    counters: Arc<Counters>,

    session: Mutex<Option<SessionInfo>>,
}

impl ConversionPipeline {
    pub fn new(config: PipelineConfig, decoder: Arc<dyn Decoder>) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let appender = OutputAppender::new(Arc::new(FileOutputWriter), config.retry);

        Self {
            header: Mutex::new(HeaderCache::new(config.header_len)),
            on_demand_header: Mutex::new(HeaderCache::new(config.header_len)),
            config,
            decoder,
            appender,
            queue: Arc::new(ChunkQueue::new()),
            state: Arc::new(state),
            events,
            counters: Arc::new(Counters::default()),
            session: Mutex::new(None),
        }
    }

    /// Replace the file writer used for appends
    pub fn with_writer(mut self, writer: Arc<dyn OutputWriter>) -> Self {
        self.appender = OutputAppender::new(writer, self.config.retry);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reset session state: drop pending chunks and forget the header
    ///
    /// Must be called before the first chunk of a new session is added.
    /// Output counters belong to the running output file and are left alone;
    /// `start_processing` resets them when it truncates the file.
    pub fn clear_queue(&self) {
        let mut header = lock(&self.header);
        let state = self.state();
        if state.is_active() {
            warn!("Clearing queue while the worker is {}", state);
        }

        header.reset();
        let dropped = self.queue.clear();
        self.counters.reset_enqueued();

        if dropped > 0 {
            warn!("Cleared queue: {} pending chunks discarded", dropped);
        } else {
            debug!("Cleared queue");
        }
    }

    /// Repair a chunk and enqueue it for the worker, returning its sequence number
    ///
    /// Never blocks on decoding or file I/O.
    pub fn add_buffer(&self, chunk: AudioChunk) -> Result<u64> {
        // Held across enqueue so sequence numbers follow queue order
        let mut header = lock(&self.header);

        let position = chunk.position;
        let data = repair(chunk, &mut header)?;
        let sequence = self.counters.enqueued.fetch_add(1, Ordering::SeqCst);

        debug!(
            "Enqueued chunk {} ({}, {} bytes)",
            sequence,
            position,
            data.len()
        );
        self.queue.enqueue(RepairedChunk {
            sequence,
            position,
            data,
        });

        Ok(sequence)
    }

    /// Create/truncate `output_path` and launch the worker
    ///
    /// Only valid while Idle.
    pub async fn start_processing(
        &self,
        output_path: impl AsRef<Path>,
        format: PcmFormat,
    ) -> Result<()> {
        let output_path = output_path.as_ref().to_path_buf();

        let mut previous = SessionState::Idle;
        let claimed = self.state.send_if_modified(|state| {
            previous = *state;
            if *state == SessionState::Idle {
                *state = SessionState::Working;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(PipelineError::InvalidState {
                operation: "start_processing",
                state: previous,
            });
        }

        if let Err(e) = tokio::fs::File::create(&output_path).await {
            error!("Failed to create output file {}: {}", output_path.display(), e);
            self.state.send_replace(SessionState::Idle);
            return Err(e.into());
        }
        self.emit(PipelineEvent::StateChanged {
            from: SessionState::Idle,
            to: SessionState::Working,
        });

        self.counters.reset_output();
        let info = SessionInfo {
            id: uuid::Uuid::new_v4().to_string(),
            output_path: output_path.clone(),
            format,
            started_at: Utc::now(),
        };
        info!(
            "Starting conversion session {} → {} ({} Hz, {} ch)",
            info.id,
            output_path.display(),
            format.sample_rate,
            format.channels
        );
        *lock(&self.session) = Some(info);

        let worker = ConversionWorker {
            queue: Arc::clone(&self.queue),
            decoder: Arc::clone(&self.decoder),
            appender: self.appender.clone(),
            output_path,
            format,
            poll_interval: self.config.poll_interval,
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            counters: Arc::clone(&self.counters),
        };

        // Detached: the worker returns the session to Idle itself
        let _ = worker.spawn();

        Ok(())
    }

    /// Ask the worker to drain the queue and wait until it has exited
    ///
    /// Everything enqueued before the worker observes an empty queue in the
    /// Draining state is converted. Returns with the state back at Idle.
    ///
    /// Cancel-safe: dropping the returned future only stops the waiting. The
    /// worker still drains and moves the session to Idle on its own.
    pub async fn stop_processing(&self) -> Result<()> {
        let mut previous = SessionState::Idle;
        let requested = self.state.send_if_modified(|state| {
            previous = *state;
            if *state == SessionState::Working {
                *state = SessionState::Draining;
                true
            } else {
                false
            }
        });

        match previous {
            SessionState::Idle => {
                return Err(PipelineError::InvalidState {
                    operation: "stop_processing",
                    state: previous,
                })
            }
            SessionState::Working if requested => {
                info!("Stop requested, draining {} queued chunks", self.queue.len());
                self.emit(PipelineEvent::StateChanged {
                    from: SessionState::Working,
                    to: SessionState::Draining,
                });
            }
            _ => {}
        }
        self.queue.notify();

        // Working can only follow an Idle from here, so it also means this
        // session has ended and another one has already started
        let mut rx = self.state.subscribe();
        let _ = rx
            .wait_for(|state| matches!(state, SessionState::Idle | SessionState::Working))
            .await;

        Ok(())
    }

    /// Repair and decode a single chunk immediately, bypassing the queue
    ///
    /// Uses its own header cache, so it can run alongside a queued session.
    pub async fn convert_buffer(&self, chunk: AudioChunk, format: PcmFormat) -> Result<Vec<u8>> {
        let repaired = {
            let mut header = lock(&self.on_demand_header);
            if chunk.position == ChunkPosition::First {
                header.reset();
            }
            repair(chunk, &mut header)?
        };

        self.decoder.decode(&repaired, format).await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Subscribe to worker events (conversions and failures)
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Captured header of the queued session, if any
    pub fn session_header(&self) -> Option<Vec<u8>> {
        lock(&self.header).header().map(<[u8]>::to_vec)
    }

    pub fn stats(&self) -> SessionStats {
        let session = lock(&self.session).clone();

        SessionStats {
            session_id: session.as_ref().map(|s| s.id.clone()),
            state: self.state(),
            output_path: session.as_ref().map(|s| s.output_path.clone()),
            format: session.as_ref().map(|s| s.format),
            started_at: session.as_ref().map(|s| s.started_at),
            queued: self.queue.len(),
            chunks_enqueued: self.counters.enqueued.load(Ordering::SeqCst),
            chunks_converted: self.counters.converted.load(Ordering::SeqCst),
            chunks_failed: self.counters.failed.load(Ordering::SeqCst),
            bytes_written: self.counters.bytes_written.load(Ordering::SeqCst),
        }
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
