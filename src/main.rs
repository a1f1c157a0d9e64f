use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pcm_relay::pipeline::{FileOutputWriter, OutputAppender};
use pcm_relay::{
    create_router, AppState, AudioChunk, AudioHub, Config, ConversionPipeline, FfmpegDecoder,
    FileRecorder, PcmFormat, PipelineEvent, SessionState,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "pcm-relay", about = "Reassemble chunked WebM audio into raw PCM")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/pcm-relay")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP ingestion service
    Serve,

    /// Convert chunk files (in capture order) into one PCM file
    Convert {
        /// Output PCM file
        #[arg(long, short)]
        output: PathBuf,

        #[arg(long, default_value_t = 16000)]
        sample_rate: u32,

        #[arg(long, default_value_t = 1)]
        channels: u16,

        /// Chunk files; the first must carry the container header
        #[arg(required = true)]
        chunks: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    let pipeline_config = cfg
        .pipeline
        .to_pipeline_config()
        .context("Invalid pipeline settings")?;
    let decoder = Arc::new(FfmpegDecoder::new(&cfg.pipeline.ffmpeg_path));
    let pipeline = Arc::new(ConversionPipeline::new(pipeline_config, decoder));

    match cli.command {
        Command::Serve => serve(cfg, pipeline).await,
        Command::Convert {
            output,
            sample_rate,
            channels,
            chunks,
        } => convert(pipeline, output, PcmFormat::new(sample_rate, channels), chunks).await,
    }
}

async fn serve(cfg: Config, pipeline: Arc<ConversionPipeline>) -> Result<()> {
    if let Some(dir) = cfg.output.path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    info!("{} starting", cfg.service.name);
    info!("PCM output: {}", cfg.output.path.display());
    info!("File uploads: {}", cfg.output.files_dir.display());

    let recorder = FileRecorder::new(
        cfg.output.files_dir.clone(),
        OutputAppender::new(Arc::new(FileOutputWriter), pipeline.config().retry),
        FfmpegDecoder::new(&cfg.pipeline.ffmpeg_path),
    );
    let hub = AudioHub::new(Arc::clone(&pipeline), cfg.output.path.clone())
        .with_file_recorder(recorder);
    let app = create_router(AppState::new(hub));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    if pipeline.state() != SessionState::Idle {
        info!("Shutting down: draining active session");
        pipeline.stop_processing().await?;
    }

    Ok(())
}

async fn convert(
    pipeline: Arc<ConversionPipeline>,
    output: PathBuf,
    format: PcmFormat,
    chunks: Vec<PathBuf>,
) -> Result<()> {
    let mut events = pipeline.subscribe();
    let reporter = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PipelineEvent::DecodeFailed { sequence, error } => {
                    warn!("Chunk {} skipped: {}", sequence, error)
                }
                PipelineEvent::PersistenceFailed { sequence, error, .. } => {
                    warn!("Chunk {} lost: {}", sequence, error)
                }
                _ => {}
            }
        }
    });

    pipeline.clear_queue();
    let last = chunks.len() - 1;
    for (i, path) in chunks.iter().enumerate() {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read chunk {}", path.display()))?;

        let chunk = match i {
            0 => AudioChunk::first(data),
            i if i == last => AudioChunk::last(data),
            _ => AudioChunk::middle(data),
        };
        pipeline
            .add_buffer(chunk)
            .with_context(|| format!("Failed to enqueue {}", path.display()))?;

        if i == 0 {
            pipeline.start_processing(&output, format).await?;
        }
    }

    pipeline.stop_processing().await?;
    reporter.abort();

    let stats = pipeline.stats();
    info!(
        "Wrote {} bytes of PCM to {} ({} chunks converted, {} failed)",
        stats.bytes_written,
        output.display(),
        stats.chunks_converted,
        stats.chunks_failed
    );

    Ok(())
}
