use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::{PipelineConfig, RetryPolicy, DEFAULT_HEADER_LEN};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Raw PCM file written by each session
    pub path: PathBuf,
    /// Where whole-file uploads are assembled and converted
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("files")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub header_len: usize,
    pub poll_interval_ms: u64,
    pub ffmpeg_path: PathBuf,
    pub write_attempts: u32,
    pub write_backoff_ms: u64,
    pub event_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            header_len: DEFAULT_HEADER_LEN,
            poll_interval_ms: 100,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            write_attempts: 4,
            write_backoff_ms: 100,
            event_capacity: 256,
        }
    }
}

impl PipelineSettings {
    /// Validate and convert to runtime tuning
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        if self.header_len == 0 {
            bail!("pipeline.header_len must be greater than zero");
        }

        Ok(PipelineConfig {
            header_len: self.header_len,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry: RetryPolicy {
                attempts: self.write_attempts,
                backoff: Duration::from_millis(self.write_backoff_ms),
            },
            event_capacity: self.event_capacity,
        })
    }
}

impl Config {
    /// Load `path` (any format the `config` crate recognizes), overridden by
    /// `PCM_RELAY__SECTION__KEY` environment variables
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("PCM_RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
