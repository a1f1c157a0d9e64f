use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::chunk::PcmFormat;
use crate::error::{PipelineError, Result};

/// Converts one self-contained encoded chunk into raw PCM
///
/// Implementations:
/// - `FfmpegDecoder`: one external ffmpeg process per chunk
/// - Test suites substitute in-process fakes
#[async_trait::async_trait]
pub trait Decoder: Send + Sync {
    /// Decode `chunk` to signed 16-bit little-endian PCM in `format`
    async fn decode(&self, chunk: &[u8], format: PcmFormat) -> Result<Vec<u8>>;

    /// Decoder name for logging
    fn name(&self) -> &str;
}

/// Decodes via an external `ffmpeg` process reading stdin and writing stdout
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    program: PathBuf,
}

impl FfmpegDecoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for a given output format
    pub fn args(format: PcmFormat) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            "-".to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ac".to_string(),
            format.channels.to_string(),
            "-ar".to_string(),
            format.sample_rate.to_string(),
            "-".to_string(),
        ]
    }

    /// Command-line arguments for a whole-file conversion to WAV
    pub fn file_args(input: &Path, output: &Path, sample_rate: u32) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            input.into(),
            "-ar".into(),
            sample_rate.to_string().into(),
            "-vn".into(),
            output.into(),
        ]
    }

    /// Convert a complete container file at `input` into a WAV file at `output`
    ///
    /// The output container is chosen by ffmpeg from the `output` extension.
    pub async fn convert_file(&self, input: &Path, output: &Path, sample_rate: u32) -> Result<()> {
        let result = Command::new(&self.program)
            .args(Self::file_args(input, output, sample_rate))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PipelineError::DecoderUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        if !result.status.success() {
            return Err(PipelineError::DecoderExit {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        info!(
            "Converted {} → {} ({} Hz)",
            input.display(),
            output.display(),
            sample_rate
        );
        Ok(())
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait::async_trait]
impl Decoder for FfmpegDecoder {
    async fn decode(&self, chunk: &[u8], format: PcmFormat) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(Self::args(format))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::DecoderUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            PipelineError::DecoderStream(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "decoder stdin not captured",
            ))
        })?;

        // stdin must be fed while stdout is drained, or a large chunk fills both pipes
        let input = chunk.to_vec();
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.flush().await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(PipelineError::DecoderStream)?;

        let write_result = writer.await.map_err(|e| {
            PipelineError::DecoderStream(std::io::Error::new(std::io::ErrorKind::Other, e))
        })?;

        if !output.status.success() {
            return Err(PipelineError::DecoderExit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        write_result.map_err(PipelineError::DecoderStream)?;

        debug!(
            "Decoded {} input bytes to {} PCM bytes ({} Hz, {} ch)",
            chunk.len(),
            output.stdout.len(),
            format.sample_rate,
            format.channels
        );

        Ok(output.stdout)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_request_s16le_at_format() {
        let args = FfmpegDecoder::args(PcmFormat::new(48000, 2));
        let joined = args.join(" ");
        assert!(joined.contains("-i - "));
        assert!(joined.contains("-f s16le -acodec pcm_s16le"));
        assert!(joined.contains("-ac 2 -ar 48000"));
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_file_args_name_input_rate_and_output() {
        let args = FfmpegDecoder::file_args(Path::new("in.webm"), Path::new("in.wav"), 16000);
        let joined = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(joined.contains("-y -i in.webm -ar 16000 -vn in.wav"));
    }
}
