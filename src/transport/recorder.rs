use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::pipeline::{ChunkPosition, FfmpegDecoder, OutputAppender};

/// What one file-upload piece did on disk
#[derive(Debug, Clone, Serialize)]
pub struct FileBufferOutcome {
    pub file_name: String,
    /// Bytes appended by this piece
    pub bytes: usize,
    /// Write attempts used for the append
    pub attempts: u32,
    /// Set once the last piece has been converted
    pub converted: Option<PathBuf>,
}

/// Assembles whole-file uploads under one directory
///
/// First starts the file over, every piece is appended as-is, and Last
/// converts the assembled file to WAV and removes the upload.
#[derive(Debug, Clone)]
pub struct FileRecorder {
    dir: PathBuf,
    appender: OutputAppender,
    converter: FfmpegDecoder,
}

impl FileRecorder {
    pub fn new(
        dir: impl Into<PathBuf>,
        appender: OutputAppender,
        converter: FfmpegDecoder,
    ) -> Self {
        Self {
            dir: dir.into(),
            appender,
            converter,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn write_buffer(
        &self,
        file_name: &str,
        data: &[u8],
        position: ChunkPosition,
        sample_rate: u32,
    ) -> Result<FileBufferOutcome> {
        let upload = self.upload_path(file_name)?;

        if position == ChunkPosition::First {
            tokio::fs::create_dir_all(&self.dir).await?;
            match tokio::fs::remove_file(&upload).await {
                Ok(()) => debug!("Replaced previous upload {}", upload.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let attempts = self.appender.append(&upload, data).await?;

        let converted = if position == ChunkPosition::Last {
            let wav = wav_path(&upload);
            self.converter.convert_file(&upload, &wav, sample_rate).await?;
            tokio::fs::remove_file(&upload).await?;
            info!("Upload {} converted to {}", file_name, wav.display());
            Some(wav)
        } else {
            None
        };

        Ok(FileBufferOutcome {
            file_name: file_name.to_string(),
            bytes: data.len(),
            attempts,
            converted,
        })
    }

    /// Resolve `file_name` inside the upload directory
    ///
    /// Only a single plain path component is accepted.
    fn upload_path(&self, file_name: &str) -> Result<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !file_name.contains(['/', '\\']) => {
                Ok(self.dir.join(name))
            }
            _ => Err(PipelineError::Transport(format!(
                "invalid upload file name `{}`",
                file_name
            ))),
        }
    }
}

fn wav_path(upload: &Path) -> PathBuf {
    let wav = upload.with_extension("wav");
    if wav == upload {
        let mut name = upload.as_os_str().to_os_string();
        name.push(".wav");
        PathBuf::from(name)
    } else {
        wav
    }
}
