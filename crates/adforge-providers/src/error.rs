//! Error types for provider operations.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from the external collaborators.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("creative generation failed: {0}")]
    GenerationFailed(String),

    #[error("creative generation timed out after {waited_secs} seconds")]
    GenerationTimeout { waited_secs: u64 },

    #[error("export failed: {0}")]
    ExportFailed(String),

    #[error("export job timed out after {waited_secs} seconds")]
    ExportTimeout { waited_secs: u64 },

    #[error("voiceover synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed(message.into())
    }

    pub fn export_failed(message: impl Into<String>) -> Self {
        Self::ExportFailed(message.into())
    }

    pub fn synthesis_failed(message: impl Into<String>) -> Self {
        Self::SynthesisFailed(message.into())
    }
}
