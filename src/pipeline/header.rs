use crate::error::{PipelineError, Result};

/// Length of the WebM initial segment emitted by browser MediaRecorder
pub const DEFAULT_HEADER_LEN: usize = 162;

/// Holds the container header taken from the first chunk of a session
#[derive(Debug, Clone)]
pub struct HeaderCache {
    header_len: usize,
    header: Option<Vec<u8>>,
}

impl HeaderCache {
    pub fn new(header_len: usize) -> Self {
        Self {
            header_len,
            header: None,
        }
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Cached header bytes, if a first chunk has been seen
    pub fn header(&self) -> Option<&[u8]> {
        self.header.as_deref()
    }

    pub fn is_captured(&self) -> bool {
        self.header.is_some()
    }

    /// Record the first `header_len` bytes of a session's first chunk
    pub fn capture(&mut self, chunk: &[u8]) -> Result<()> {
        if self.header.is_some() {
            return Err(PipelineError::HeaderAlreadyCaptured);
        }
        if self.header_len == 0 {
            return Err(PipelineError::Transport(
                "session header length is zero; nothing can be captured".to_string(),
            ));
        }
        if chunk.len() < self.header_len {
            return Err(PipelineError::Transport(format!(
                "first chunk is {} bytes, shorter than the {}-byte session header",
                chunk.len(),
                self.header_len
            )));
        }

        self.header = Some(chunk[..self.header_len].to_vec());
        Ok(())
    }

    /// Return `header ++ chunk`
    pub fn prepend(&self, chunk: &[u8], position: &str) -> Result<Vec<u8>> {
        let header = self.header.as_ref().ok_or_else(|| PipelineError::MissingHeader {
            position: position.to_string(),
        })?;

        let mut repaired = Vec::with_capacity(header.len() + chunk.len());
        repaired.extend_from_slice(header);
        repaired.extend_from_slice(chunk);
        Ok(repaired)
    }

    /// Forget the header so the next first chunk can be captured
    pub fn reset(&mut self) {
        self.header = None;
    }
}

impl Default for HeaderCache {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_LEN)
    }
}
