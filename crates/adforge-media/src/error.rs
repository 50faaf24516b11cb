//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the external media tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("merge failed (exit code {exit_code:?}): {stderr_tail}")]
    MergeFailed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("merge produced an empty output file: {0}")]
    EmptyOutput(PathBuf),

    #[error("ffprobe failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("invalid media file: {0}")]
    InvalidMedia(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a merge failure carrying a bounded diagnostic tail.
    pub fn merge_failed(exit_code: Option<i32>, stderr_tail: impl Into<String>) -> Self {
        Self::MergeFailed {
            exit_code,
            stderr_tail: stderr_tail.into(),
        }
    }

    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr,
        }
    }
}
