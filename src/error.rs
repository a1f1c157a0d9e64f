//! Error types for the conversion pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::SessionState;

/// Broad classification of a [`PipelineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation invoked in the wrong session state
    State,
    /// External decoder failed
    Decode,
    /// Output append failed after all retries
    Persistence,
    /// Malformed chunk payload from the ingestion side
    Transport,
    /// Session setup I/O (e.g. creating the output file)
    Io,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{operation} is not valid while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("no session header captured yet; a first chunk must be enqueued before {position} chunks")]
    MissingHeader { position: String },

    #[error("session header already captured; clear the queue before starting a new session")]
    HeaderAlreadyCaptured,

    #[error("failed to start decoder `{program}`: {source}")]
    DecoderUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("decoder stream error: {0}")]
    DecoderStream(#[source] io::Error),

    #[error("decoder exited with {status}: {stderr}")]
    DecoderExit { status: String, stderr: String },

    #[error("failed to append to {} after {attempts} attempts: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("malformed chunk payload: {0}")]
    Transport(String),

    #[error("file uploads are not enabled on this service")]
    FileIngestDisabled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState { .. }
            | Self::MissingHeader { .. }
            | Self::HeaderAlreadyCaptured
            | Self::FileIngestDisabled => ErrorKind::State,
            Self::DecoderUnavailable { .. } | Self::DecoderStream(_) | Self::DecoderExit { .. } => {
                ErrorKind::Decode
            }
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<base64::DecodeError> for PipelineError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Transport(format!("invalid base64: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = PipelineError::InvalidState {
            operation: "start_processing",
            state: SessionState::Working,
        };
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(
            err.to_string(),
            "start_processing is not valid while the session is working"
        );

        let err = PipelineError::DecoderExit {
            status: "exit status: 1".to_string(),
            stderr: "Invalid data found when processing input".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = PipelineError::Persistence {
            path: PathBuf::from("/tmp/out.pcm"),
            attempts: 4,
            source: io::Error::new(io::ErrorKind::PermissionDenied, "locked"),
        };
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(err.to_string().contains("after 4 attempts"));
    }

    #[test]
    fn test_base64_error_is_transport() {
        use base64::Engine;
        let err: PipelineError = base64::engine::general_purpose::STANDARD
            .decode("not base64!!")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
