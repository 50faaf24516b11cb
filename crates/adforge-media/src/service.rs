//! Merge service trait seam.
//!
//! The pipeline depends on this trait rather than on ffmpeg directly so
//! orchestration logic is testable with stub implementations.

use std::path::Path;

use async_trait::async_trait;

use crate::command::ffmpeg_available;
use crate::error::MediaResult;
use crate::merge::{merge_video_audio, MergeOptions, MergeOutput};
use crate::probe::{verify_audio_stream, AudioStreamInfo};

/// Capability contract for merging and verifying media files.
#[async_trait]
pub trait MergeService: Send + Sync {
    /// Whether the underlying media tool can be invoked at all.
    async fn is_available(&self) -> bool;

    /// Merge a video and an audio file per the options.
    async fn merge(
        &self,
        video_path: &Path,
        audio_path: &Path,
        options: &MergeOptions,
    ) -> MediaResult<MergeOutput>;

    /// Probe a file for the presence of an audio stream.
    async fn verify_audio(&self, path: &Path) -> MediaResult<AudioStreamInfo>;
}

/// Production implementation backed by the ffmpeg/ffprobe binaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegMergeService;

impl FfmpegMergeService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MergeService for FfmpegMergeService {
    async fn is_available(&self) -> bool {
        ffmpeg_available().await
    }

    async fn merge(
        &self,
        video_path: &Path,
        audio_path: &Path,
        options: &MergeOptions,
    ) -> MediaResult<MergeOutput> {
        merge_video_audio(video_path, audio_path, options).await
    }

    async fn verify_audio(&self, path: &Path) -> MediaResult<AudioStreamInfo> {
        verify_audio_stream(path).await
    }
}
