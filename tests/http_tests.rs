// Integration tests for the HTTP ingestion API
//
// These tests drive the router in-process with a fake decoder, covering the
// first/middle/last session flow and how failures map to status codes.

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use common::{format, pipeline_with, FakeDecoder};
use pcm_relay::{create_router, AppState, AudioBufferMessage, AudioHub, ChunkPosition};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn app(output: PathBuf) -> Router {
    let pipeline = Arc::new(pipeline_with(Arc::new(FakeDecoder::new())));
    create_router(AppState::new(AudioHub::new(pipeline, output)))
}

async fn post_json(app: &Router, uri: &str, body: String) -> Result<(StatusCode, Value)> {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))?,
        )
        .await?;

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

async fn send_buffer(app: &Router, data: &[u8], position: ChunkPosition) -> Result<(StatusCode, Value)> {
    let msg = AudioBufferMessage::new(data, position, format());
    post_json(app, "/audio/buffer", serde_json::to_string(&msg)?).await
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let app = app(temp_dir.path().join("out.pcm"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_session_flow_writes_pcm() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().join("session.pcm");
    let app = app(output.clone());

    let (status, stats) = send_buffer(&app, b"HHHHone", ChunkPosition::First).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["state"], "working");

    let (status, _) = send_buffer(&app, b"two", ChunkPosition::Middle).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, stats) = send_buffer(&app, b"three", ChunkPosition::Last).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["state"], "idle");
    assert_eq!(stats["chunks_converted"], 3);
    assert_eq!(stats["queued"], 0);

    assert_eq!(fs::read(&output)?, b"PCMonePCMtwoPCMthree".to_vec());

    let response = app
        .oneshot(Request::builder().uri("/audio/status").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let status: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(status["bytes_written"], 20);

    Ok(())
}

#[tokio::test]
async fn test_new_first_chunk_starts_fresh_session() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().join("restart.pcm");
    let app = app(output.clone());

    send_buffer(&app, b"AAAAold", ChunkPosition::First).await?;
    send_buffer(&app, b"stale", ChunkPosition::Middle).await?;

    // No Last for the first session: the next First drains it and truncates
    let (status, _) = send_buffer(&app, b"BBBBnew", ChunkPosition::First).await?;
    assert_eq!(status, StatusCode::OK);
    send_buffer(&app, b"end", ChunkPosition::Last).await?;

    assert_eq!(fs::read(&output)?, b"PCMnewPCMend".to_vec());
    Ok(())
}

#[tokio::test]
async fn test_malformed_base64_is_bad_request() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let app = app(temp_dir.path().join("out.pcm"));

    let body = r#"{"buffer":"!!not base64!!","position":"first","sample_rate":16000,"channels":1}"#;
    let (status, error) = post_json(&app, "/audio/buffer", body.to_string()).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["kind"], "transport");
    Ok(())
}

#[tokio::test]
async fn test_middle_without_session_is_conflict() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let app = app(temp_dir.path().join("out.pcm"));

    let (status, error) = send_buffer(&app, b"orphan", ChunkPosition::Middle).await?;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["kind"], "state");
    Ok(())
}

#[tokio::test]
async fn test_convert_returns_pcm_immediately() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().join("untouched.pcm");
    let app = app(output.clone());

    let msg = AudioBufferMessage::new(b"HHHHnow", ChunkPosition::First, format());
    let (status, body) = post_json(&app, "/audio/convert", serde_json::to_string(&msg)?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bytes"], 6);
    let pcm = base64::engine::general_purpose::STANDARD
        .decode(body["pcm"].as_str().unwrap_or_default())?;
    assert_eq!(pcm, b"PCMnow".to_vec());
    assert!(!output.exists());

    Ok(())
}
