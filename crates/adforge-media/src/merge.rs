//! Audio/video merge engine.
//!
//! Combines a silent video stream with a narration audio track into one
//! web-ready MP4: video stream-copied, audio re-encoded with optional
//! volume scaling, loudness normalization, and fades.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration_or_unknown;

/// Fixed audio bitrate for the merged output.
const AUDIO_BITRATE: &str = "192k";

/// EBU R128 loudness normalization target.
const LOUDNORM_FILTER: &str = "loudnorm=I=-16:TP=-1.5:LRA=11";

/// Options for a merge invocation.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Explicit output path; wins over `output_dir`/`filename`
    pub output_path: Option<PathBuf>,
    /// Directory for the output (default: alongside the video input)
    pub output_dir: Option<PathBuf>,
    /// Output filename (default: `<video stem>_merged.mp4`)
    pub filename: Option<String>,
    /// Volume multiplier for the narration track (0.0 - 2.0)
    pub audio_volume: f64,
    /// Audio fade-in duration in seconds
    pub fade_in: f64,
    /// Audio fade-out duration in seconds
    pub fade_out: f64,
    /// Apply loudness normalization
    pub normalize_audio: bool,
    /// Mix the narration with the video's original audio instead of
    /// replacing it
    pub keep_original_audio: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            output_dir: None,
            filename: None,
            audio_volume: 1.0,
            fade_in: 0.5,
            fade_out: 0.5,
            normalize_audio: true,
            keep_original_audio: false,
        }
    }
}

/// Probed/measured metadata for a completed merge.
#[derive(Debug, Clone)]
pub struct MergeMetadata {
    pub video_duration: Option<f64>,
    pub audio_duration: Option<f64>,
    pub file_size_mb: f64,
    pub video_source: PathBuf,
    pub audio_source: PathBuf,
}

/// A completed merge.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub output_path: PathBuf,
    pub metadata: MergeMetadata,
}

/// Merge a video file and an audio file into a single MP4.
///
/// Both inputs must exist locally. Duration probes degrade to "unknown"
/// (fades are skipped without an audio duration); the merge itself only
/// fails on missing inputs, a missing tool, a non-zero ffmpeg exit, or an
/// empty output file.
pub async fn merge_video_audio(
    video_path: impl AsRef<Path>,
    audio_path: impl AsRef<Path>,
    options: &MergeOptions,
) -> MediaResult<MergeOutput> {
    let video_path = video_path.as_ref();
    let audio_path = audio_path.as_ref();

    if !video_path.exists() {
        return Err(MediaError::MissingInput(video_path.to_path_buf()));
    }
    if !audio_path.exists() {
        return Err(MediaError::MissingInput(audio_path.to_path_buf()));
    }

    check_ffmpeg()?;

    let output_path = resolve_output_path(video_path, options);

    info!(
        "Merging {} + {} -> {}",
        video_path.display(),
        audio_path.display(),
        output_path.display()
    );

    let video_duration = probe_duration_or_unknown(video_path).await;
    let audio_duration = probe_duration_or_unknown(audio_path).await;
    debug!(
        "Input durations: video={:?}s audio={:?}s",
        video_duration, audio_duration
    );

    let mut cmd = FfmpegCommand::new(&output_path)
        .input(video_path)
        .input(audio_path)
        .map("0:v:0");

    if options.keep_original_audio {
        // Mix narration into the original track; duration governed by the
        // video's own audio.
        cmd = cmd
            .filter_complex("[0:a][1:a]amix=inputs=2:duration=first[aout]")
            .map("[aout]");
    } else {
        cmd = cmd.map("1:a:0");
        let filters = build_audio_filters(options, audio_duration);
        if !filters.is_empty() {
            cmd = cmd.audio_filter(filters.join(","));
        }
    }

    cmd = cmd
        .video_codec("copy")
        .audio_codec("aac")
        .audio_bitrate(AUDIO_BITRATE)
        .shortest()
        .faststart();

    FfmpegRunner::new().run(&cmd).await?;

    let size_bytes = check_output_nonempty(&output_path).await?;
    let file_size_mb = (size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;

    info!("Merge complete: {} ({} MB)", output_path.display(), file_size_mb);

    Ok(MergeOutput {
        output_path,
        metadata: MergeMetadata {
            video_duration,
            audio_duration,
            file_size_mb,
            video_source: video_path.to_path_buf(),
            audio_source: audio_path.to_path_buf(),
        },
    })
}

/// Build the narration filter chain for replace mode.
///
/// Fades need a known audio duration; without one they are skipped. The
/// fade-out start is clamped to zero for clips shorter than the fade.
fn build_audio_filters(options: &MergeOptions, audio_duration: Option<f64>) -> Vec<String> {
    let mut filters = Vec::new();

    if (options.audio_volume - 1.0).abs() > f64::EPSILON {
        filters.push(format!("volume={}", options.audio_volume));
    }

    if options.normalize_audio {
        filters.push(LOUDNORM_FILTER.to_string());
    }

    if let Some(duration) = audio_duration {
        if options.fade_in > 0.0 {
            filters.push(format!("afade=t=in:st=0:d={}", options.fade_in));
        }
        if options.fade_out > 0.0 {
            let fade_out_start = (duration - options.fade_out).max(0.0);
            filters.push(format!(
                "afade=t=out:st={}:d={}",
                fade_out_start, options.fade_out
            ));
        }
    }

    filters
}

/// Resolve the output path from the options.
fn resolve_output_path(video_path: &Path, options: &MergeOptions) -> PathBuf {
    if let Some(path) = &options.output_path {
        return path.clone();
    }

    let filename = options.filename.clone().unwrap_or_else(|| {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        format!("{stem}_merged.mp4")
    });

    let dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| video_path.parent().unwrap_or(Path::new(".")).to_path_buf());

    dir.join(filename)
}

/// Re-read the output after a nominally successful merge; an empty file is
/// a failure even though the tool exited zero.
async fn check_output_nonempty(path: &Path) -> MediaResult<u64> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() == 0 {
        return Err(MediaError::EmptyOutput(path.to_path_buf()));
    }
    Ok(metadata.len())
}
