use std::time::Duration;

use super::appender::RetryPolicy;
use super::header::DEFAULT_HEADER_LEN;

/// Runtime tuning for a [`ConversionPipeline`](super::ConversionPipeline)
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bytes taken from the first chunk as the session header
    pub header_len: usize,

    /// Upper bound on how long an idle worker waits before re-checking the queue
    pub poll_interval: Duration,

    /// Retry policy for output appends
    pub retry: RetryPolicy,

    /// Buffered events per subscriber before lagging receivers drop events
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            header_len: DEFAULT_HEADER_LEN,
            poll_interval: Duration::from_millis(100),
            retry: RetryPolicy::default(),
            event_capacity: 256,
        }
    }
}
