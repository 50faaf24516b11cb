//! AdForge command-line entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adforge_jobs::{CdnExporter, ExportJobManager, JobManagerConfig};
use adforge_media::{merge_video_audio, FfmpegMergeService, MergeOptions};
use adforge_models::CampaignSpec;
use adforge_pipeline::{run_campaign, CampaignConfig, PipelineContext};
use adforge_providers::{
    DesignApiClient, DesignToken, ExportApiClient, VoiceApiClient, VoiceApiKey, VoiceSynthesizer,
};

#[derive(Parser)]
#[command(name = "adforge", about = "Campaign video ads with synchronized voiceover")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report availability of the local media tools
    Check,
    /// Run a campaign from a spec file
    Run {
        /// Path to a campaign spec (JSON)
        #[arg(long)]
        spec: PathBuf,
    },
    /// Export designs as background jobs and wait for them
    Export {
        /// Design identifiers to export
        design_ids: Vec<String>,
        #[arg(long, default_value = "batch-export")]
        campaign: String,
    },
    /// Merge a video and an audio file directly
    Merge {
        video: PathBuf,
        audio: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 0.3)]
        fade_in: f64,
        #[arg(long, default_value_t = 0.5)]
        fade_out: f64,
        #[arg(long, default_value_t = 1.0)]
        volume: f64,
        /// Mix with the video's original audio instead of replacing it
        #[arg(long)]
        keep_original_audio: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Check => check().await,
        Command::Run { spec } => run(spec).await,
        Command::Export {
            design_ids,
            campaign,
        } => export(design_ids, campaign).await,
        Command::Merge {
            video,
            audio,
            output,
            fade_in,
            fade_out,
            volume,
            keep_original_audio,
        } => {
            let options = MergeOptions {
                output_path: output,
                fade_in,
                fade_out,
                audio_volume: volume,
                keep_original_audio,
                ..Default::default()
            };
            merge(video, audio, options).await
        }
    }
}

/// Initialize tracing with colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,adforge=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(false))
            .with(env_filter)
            .init();
    }
}

async fn check() -> anyhow::Result<()> {
    let ffmpeg = adforge_media::ffmpeg_available().await;
    let ffprobe = adforge_media::check_ffprobe().is_ok();
    println!("ffmpeg:  {}", if ffmpeg { "available" } else { "NOT FOUND" });
    println!("ffprobe: {}", if ffprobe { "available" } else { "NOT FOUND" });
    if !ffmpeg || !ffprobe {
        bail!("media tools missing; merges will be skipped");
    }
    Ok(())
}

async fn run(spec_path: PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&spec_path)
        .with_context(|| format!("reading campaign spec {}", spec_path.display()))?;
    let spec: CampaignSpec = serde_json::from_str(&raw).context("parsing campaign spec")?;

    let token = std::env::var("ADFORGE_DESIGN_TOKEN")
        .map(DesignToken::new)
        .context("ADFORGE_DESIGN_TOKEN is required")?;

    let voice: Option<Arc<dyn VoiceSynthesizer>> = match std::env::var("ADFORGE_VOICE_API_KEY") {
        Ok(key) => Some(Arc::new(VoiceApiClient::new(VoiceApiKey::new(key)))),
        Err(_) => {
            info!("ADFORGE_VOICE_API_KEY not set; voiceover stages will be skipped");
            None
        }
    };

    let ctx = PipelineContext::new(
        CampaignConfig::from_env(),
        Arc::new(DesignApiClient::new(token.clone())),
        voice,
        Arc::new(ExportApiClient::new(token)),
        Arc::new(FfmpegMergeService::new()),
    );

    let manifest = run_campaign(&ctx, &spec).await?;

    println!("{}", serde_json::to_string_pretty(&manifest.summary)?);
    println!("Output: {}", manifest.directory.display());
    Ok(())
}

async fn export(design_ids: Vec<String>, campaign: String) -> anyhow::Result<()> {
    if design_ids.is_empty() {
        bail!("at least one design id is required");
    }

    let token = std::env::var("ADFORGE_DESIGN_TOKEN")
        .map(DesignToken::new)
        .context("ADFORGE_DESIGN_TOKEN is required")?;

    let exporter = Arc::new(CdnExporter::new(Arc::new(ExportApiClient::new(token))));
    let manager = ExportJobManager::new(JobManagerConfig::from_env()).await;

    let batch = manager.create_batch(design_ids, &campaign, exporter).await;
    for job in &batch.jobs {
        println!("created {} for design {}", job.job_id, job.design_id);
    }

    for handle in batch.handles {
        handle.await?;
    }

    for job in manager.list_jobs(None).await {
        match job.status {
            adforge_models::ExportJobStatus::Completed => println!(
                "{} {} -> {}",
                job.job_id,
                job.status,
                job.download_urls.unwrap_or_default().join(", ")
            ),
            _ => println!(
                "{} {} {}",
                job.job_id,
                job.status,
                job.error.unwrap_or_default()
            ),
        }
    }
    Ok(())
}

async fn merge(video: PathBuf, audio: PathBuf, options: MergeOptions) -> anyhow::Result<()> {
    let result = merge_video_audio(&video, &audio, &options).await?;

    println!("Merged:  {}", result.output_path.display());
    println!("Size:    {} MB", result.metadata.file_size_mb);
    if let Some(duration) = result.metadata.video_duration {
        println!("Video:   {duration:.2}s");
    }
    if let Some(duration) = result.metadata.audio_duration {
        println!("Audio:   {duration:.2}s");
    }
    Ok(())
}
