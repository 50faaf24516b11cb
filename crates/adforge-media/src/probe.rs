//! FFprobe duration probing and audio-stream verification.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::warn;

use crate::error::{MediaError, MediaResult};

/// Presence (and shape) of an audio stream in a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStreamInfo {
    pub has_audio: bool,
    pub codec: Option<String>,
    pub channels: Option<u32>,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    channels: Option<u32>,
}

/// Probe a file's container duration in seconds.
///
/// Returns `Ok(None)` when the container reports no duration; callers that
/// can proceed without one (e.g. the merge fades) treat probe *errors* the
/// same way.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<Option<f64>> {
    let raw = run_ffprobe(path.as_ref()).await?;
    let probe: FfprobeOutput = serde_json::from_str(&raw)?;
    Ok(parse_duration(&probe))
}

/// Probe a file's duration, degrading any failure to "unknown".
pub async fn probe_duration_or_unknown(path: impl AsRef<Path>) -> Option<f64> {
    let path = path.as_ref();
    match probe_duration(path).await {
        Ok(duration) => duration,
        Err(e) => {
            warn!("Duration probe failed for {}: {}", path.display(), e);
            None
        }
    }
}

/// Verify whether a file contains an audio stream.
pub async fn verify_audio_stream(path: impl AsRef<Path>) -> MediaResult<AudioStreamInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::MissingInput(path.to_path_buf()));
    }

    let raw = run_ffprobe(path).await?;
    let probe: FfprobeOutput = serde_json::from_str(&raw)?;
    Ok(parse_audio_stream(&probe))
}

/// Run ffprobe and return its JSON stdout.
async fn run_ffprobe(path: &Path) -> MediaResult<String> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            format!("ffprobe failed for {}", path.display()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn parse_duration(probe: &FfprobeOutput) -> Option<f64> {
    probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
}

fn parse_audio_stream(probe: &FfprobeOutput) -> AudioStreamInfo {
    match probe.streams.iter().find(|s| s.codec_type == "audio") {
        Some(stream) => AudioStreamInfo {
            has_audio: true,
            codec: stream.codec_name.clone(),
            channels: stream.channels,
        },
        None => AudioStreamInfo {
            has_audio: false,
            codec: None,
            channels: None,
        },
    }
}
