//! FFmpeg CLI wrapper for the AdForge pipeline.
//!
//! Provides the audio/video merge engine, duration probing, and
//! audio-stream verification. The external binaries are discovered via
//! PATH and invoked one-shot per operation.

pub mod command;
pub mod error;
pub mod merge;
pub mod probe;
pub mod service;

pub use command::{check_ffmpeg, check_ffprobe, ffmpeg_available, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use merge::{merge_video_audio, MergeMetadata, MergeOptions, MergeOutput};
pub use probe::{probe_duration, probe_duration_or_unknown, verify_audio_stream, AudioStreamInfo};
pub use service::{FfmpegMergeService, MergeService};
