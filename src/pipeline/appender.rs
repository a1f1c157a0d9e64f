use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::warn;

use crate::error::{PipelineError, Result};

/// Bounded retry for output writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub attempts: u32,
    /// Sleep between consecutive attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Low-level append of bytes to the end of a file
#[async_trait::async_trait]
pub trait OutputWriter: Send + Sync {
    async fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Opens (creating if needed), seeks to end, writes and flushes on every call
///
/// The file is reopened per append so another process may briefly hold it
/// between chunks.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileOutputWriter;

#[async_trait::async_trait]
impl OutputWriter for FileOutputWriter {
    async fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(path)
            .await?;
        file.seek(io::SeekFrom::End(0)).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Appends decoded PCM to the session output, retrying transient failures
#[derive(Clone)]
pub struct OutputAppender {
    writer: Arc<dyn OutputWriter>,
    policy: RetryPolicy,
}

impl OutputAppender {
    pub fn new(writer: Arc<dyn OutputWriter>, policy: RetryPolicy) -> Self {
        Self { writer, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Append `bytes` to `path`, returning the number of attempts used
    ///
    /// A failed attempt is truncated back to the length the file had before
    /// it, so a partial write is never followed by a full retry.
    pub async fn append(&self, path: &Path, bytes: &[u8]) -> Result<u32> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;

        loop {
            let before = file_len(path).await;

            match self.writer.append(path, bytes).await {
                Ok(()) => return Ok(attempt),
                Err(e) => {
                    rollback(path, before).await;
                    if attempt >= attempts {
                        return Err(PipelineError::Persistence {
                            path: PathBuf::from(path),
                            attempts,
                            source: e,
                        });
                    }

                    warn!(
                        "Append to {} failed (attempt {}/{}): {}",
                        path.display(),
                        attempt,
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Current length of `path`, or None when it does not exist yet
async fn file_len(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}

/// Drop whatever a failed attempt left past `before`
async fn rollback(path: &Path, before: Option<u64>) {
    let Some(written) = file_len(path).await else {
        return;
    };
    let keep = before.unwrap_or(0);
    if written <= keep {
        return;
    }

    let truncated = async {
        let file = OpenOptions::new().write(true).open(path).await?;
        file.set_len(keep).await
    };
    match truncated.await {
        Ok(()) => warn!(
            "Discarded {} bytes of a failed append to {}",
            written - keep,
            path.display()
        ),
        Err(e) => warn!(
            "Failed to roll back partial append to {}: {}",
            path.display(),
            e
        ),
    }
}

impl Default for OutputAppender {
    fn default() -> Self {
        Self::new(Arc::new(FileOutputWriter), RetryPolicy::default())
    }
}

impl std::fmt::Debug for OutputAppender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputAppender")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
