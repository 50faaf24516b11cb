//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that escape a pipeline invocation.
///
/// Stage-level failures are captured into the `CreativeResult` instead of
/// surfacing here; these variants cover infrastructure problems (workspace
/// creation, manifest persistence) and genuinely unexpected failures that
/// the orchestrator converts into failed-variation records.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("provider error: {0}")]
    Provider(#[from] adforge_providers::ProviderError),

    #[error("media error: {0}")]
    Media(#[from] adforge_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
