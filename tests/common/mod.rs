// Shared fakes for pipeline integration tests
#![allow(dead_code)]

use pcm_relay::pipeline::{FileOutputWriter, OutputWriter};
use pcm_relay::{ConversionPipeline, Decoder, PcmFormat, PipelineConfig, PipelineError, RetryPolicy};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HEADER_LEN: usize = 4;

/// Decoder that returns `PCM` ++ (input minus header), recording every input
#[derive(Default)]
pub struct FakeDecoder {
    pub inputs: Mutex<Vec<Vec<u8>>>,
    /// Inputs containing this marker fail to decode
    pub fail_marker: Option<Vec<u8>>,
    pub delay: Option<Duration>,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &[u8]) -> Self {
        Self {
            fail_marker: Some(marker.to_vec()),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn inputs(&self) -> Vec<Vec<u8>> {
        self.inputs.lock().unwrap().clone()
    }

    /// What this decoder produces for a repaired chunk
    pub fn expected_pcm(repaired: &[u8]) -> Vec<u8> {
        let mut pcm = b"PCM".to_vec();
        pcm.extend_from_slice(&repaired[HEADER_LEN..]);
        pcm
    }
}

#[async_trait::async_trait]
impl Decoder for FakeDecoder {
    async fn decode(&self, chunk: &[u8], _format: PcmFormat) -> Result<Vec<u8>, PipelineError> {
        self.inputs.lock().unwrap().push(chunk.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(marker) = &self.fail_marker {
            if chunk.windows(marker.len()).any(|w| w == marker.as_slice()) {
                return Err(PipelineError::DecoderExit {
                    status: "exit status: 1".to_string(),
                    stderr: "Invalid data found when processing input".to_string(),
                });
            }
        }

        Ok(Self::expected_pcm(chunk))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Writer that fails the next `fail_next` appends, then writes for real
#[derive(Default)]
pub struct FlakyWriter {
    pub fail_next: AtomicU32,
    pub calls: AtomicU32,
}

impl FlakyWriter {
    pub fn failing(times: u32) -> Self {
        Self {
            fail_next: AtomicU32::new(times),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait::async_trait]
impl OutputWriter for FlakyWriter {
    async fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is being used by another process",
            ));
        }

        FileOutputWriter.append(path, bytes).await
    }
}

/// Writer whose next `torn_next` appends write half the bytes and then fail
#[derive(Default)]
pub struct TornWriter {
    pub torn_next: AtomicU32,
    pub calls: AtomicU32,
}

impl TornWriter {
    pub fn tearing(times: u32) -> Self {
        Self {
            torn_next: AtomicU32::new(times),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait::async_trait]
impl OutputWriter for TornWriter {
    async fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.torn_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.torn_next.store(remaining - 1, Ordering::SeqCst);
            FileOutputWriter.append(path, &bytes[..bytes.len() / 2]).await?;
            return Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"));
        }

        FileOutputWriter.append(path, bytes).await
    }
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        header_len: HEADER_LEN,
        poll_interval: Duration::from_millis(10),
        retry: RetryPolicy {
            attempts: 4,
            backoff: Duration::from_millis(1),
        },
        event_capacity: 1024,
    }
}

pub fn pipeline_with(decoder: Arc<FakeDecoder>) -> ConversionPipeline {
    ConversionPipeline::new(test_config(), decoder)
}

pub fn format() -> PcmFormat {
    PcmFormat::new(16000, 1)
}
