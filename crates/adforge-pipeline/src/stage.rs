//! Tagged stage outcomes.

/// Outcome of one pipeline stage.
///
/// Stage-local failures never cross the stage boundary as errors; they are
/// recorded on the result and reported as `Degraded`. `Skipped` marks
/// prerequisites that were absent (no script, no credential, no tool) and
/// is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    Degraded(String),
    Skipped(String),
}

impl StageOutcome {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded(reason.into())
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed)
    }
}

impl std::fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageOutcome::Completed => write!(f, "completed"),
            StageOutcome::Degraded(reason) => write!(f, "degraded: {reason}"),
            StageOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}
