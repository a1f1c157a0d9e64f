use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

use super::chunk::RepairedChunk;

/// Thread-safe FIFO of chunks awaiting conversion
///
/// Safe for concurrent producers and a single consuming worker. Every enqueue
/// also wakes the worker so it does not have to wait out its poll interval.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    chunks: Mutex<VecDeque<RepairedChunk>>,
    wake: Notify,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk to the back of the queue (never blocks on I/O)
    pub fn enqueue(&self, chunk: RepairedChunk) {
        self.lock().push_back(chunk);
        self.wake.notify_one();
    }

    /// Pop the oldest chunk, or `None` if the queue is empty
    pub fn try_dequeue(&self) -> Option<RepairedChunk> {
        self.lock().pop_front()
    }

    /// Drop all pending chunks, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut chunks = self.lock();
        let dropped = chunks.len();
        chunks.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wake the worker without enqueueing anything (used on stop)
    pub fn notify(&self) {
        self.wake.notify_one();
    }

    /// Resolve on the next enqueue or notify
    pub async fn notified(&self) {
        self.wake.notified().await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<RepairedChunk>> {
        // A panic while holding the lock cannot leave the deque half-updated
        self.chunks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
