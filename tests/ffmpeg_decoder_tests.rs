// Integration tests for the external-process decoder
//
// ffmpeg itself is not required: these tests substitute small programs that
// accept (and ignore) ffmpeg's arguments to exercise the process plumbing.
#![cfg(unix)]

use anyhow::Result;
use pcm_relay::{Decoder, ErrorKind, FfmpegDecoder, PcmFormat, PipelineError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

#[tokio::test]
async fn test_stdout_is_returned_as_pcm() -> Result<()> {
    let dir = TempDir::new()?;
    let echo = script(&dir, "echo-decoder", "cat")?;

    let decoder = FfmpegDecoder::new(echo);
    let pcm = decoder.decode(b"repaired chunk", PcmFormat::new(16000, 1)).await?;

    assert_eq!(pcm, b"repaired chunk".to_vec());
    Ok(())
}

#[tokio::test]
async fn test_large_chunk_does_not_deadlock() -> Result<()> {
    let dir = TempDir::new()?;
    let echo = script(&dir, "echo-decoder", "cat")?;

    // Well beyond a pipe buffer in both directions
    let input: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

    let decoder = FfmpegDecoder::new(echo);
    let pcm = tokio::time::timeout(
        std::time::Duration::from_secs(20),
        decoder.decode(&input, PcmFormat::new(48000, 2)),
    )
    .await??;

    assert_eq!(pcm.len(), input.len());
    assert_eq!(pcm, input);
    Ok(())
}

#[tokio::test]
async fn test_arguments_reach_the_process() -> Result<()> {
    let dir = TempDir::new()?;
    let args = script(&dir, "args-decoder", "cat > /dev/null; printf '%s ' \"$@\"")?;

    let decoder = FfmpegDecoder::new(args);
    let out = decoder.decode(b"x", PcmFormat::new(22050, 2)).await?;
    let out = String::from_utf8(out)?;

    assert!(out.contains("-f s16le"));
    assert!(out.contains("-ac 2"));
    assert!(out.contains("-ar 22050"));
    Ok(())
}

#[tokio::test]
async fn test_nonzero_exit_is_decode_error_with_stderr() -> Result<()> {
    let dir = TempDir::new()?;
    let failing = script(
        &dir,
        "failing-decoder",
        "cat > /dev/null; echo 'pipe:: Invalid data found when processing input' >&2; exit 1",
    )?;

    let decoder = FfmpegDecoder::new(failing);
    let err = decoder
        .decode(b"not webm", PcmFormat::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    match err {
        PipelineError::DecoderExit { stderr, .. } => {
            assert!(stderr.contains("Invalid data"));
        }
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_program_is_decode_error() {
    let decoder = FfmpegDecoder::new("/nonexistent/bin/ffmpeg");
    let err = decoder
        .decode(b"chunk", PcmFormat::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(matches!(err, PipelineError::DecoderUnavailable { .. }));
}
