//! Async export job records and their status state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error parsing an `ExportJobStatus` from text.
#[derive(Debug, Error)]
#[error("unknown job status: {0}")]
pub struct ParseStatusError(String);

/// Export job status.
///
/// Transitions: Queued -> Processing -> {Completed | Failed}.
/// Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportJobStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ExportJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportJobStatus::Queued => "queued",
            ExportJobStatus::Processing => "processing",
            ExportJobStatus::Completed => "completed",
            ExportJobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions permitted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportJobStatus::Completed | ExportJobStatus::Failed)
    }
}

impl std::fmt::Display for ExportJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExportJobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queued" => Ok(ExportJobStatus::Queued),
            "processing" => Ok(ExportJobStatus::Processing),
            "completed" => Ok(ExportJobStatus::Completed),
            "failed" => Ok(ExportJobStatus::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A trackable unit of asynchronous export-and-merge work.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportJob {
    /// Globally-unique identifier: `exp_<unix-millis>_<8 hex>`
    pub job_id: String,
    /// Design being exported
    pub design_id: String,
    /// Campaign tag for grouping
    pub campaign: String,
    pub status: ExportJobStatus,
    /// Coarse progress indicator (0-100)
    pub progress: u8,
    /// Download references, set on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Failure message, set on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExportJob {
    /// Create a new job in the Queued state.
    pub fn new(design_id: impl Into<String>, campaign: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: generate_job_id(now),
            design_id: design_id.into(),
            campaign: campaign.into(),
            status: ExportJobStatus::Queued,
            progress: 0,
            download_urls: None,
            thumbnail_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to Processing when background work starts.
    pub fn start(&mut self) {
        self.status = ExportJobStatus::Processing;
        self.progress = 10;
        self.updated_at = Utc::now();
    }

    /// Terminate as Completed with the download references.
    pub fn complete(&mut self, download_urls: Vec<String>, thumbnail_url: Option<String>) {
        self.status = ExportJobStatus::Completed;
        self.progress = 100;
        self.download_urls = Some(download_urls);
        self.thumbnail_url = thumbnail_url;
        self.updated_at = Utc::now();
    }

    /// Terminate as Failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ExportJobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

/// Unique job identifier: creation time plus a random suffix.
fn generate_job_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("exp_{}_{}", now.timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = ExportJob::new("design-123", "spring-launch");
        assert!(job.job_id.starts_with("exp_"));
        assert_eq!(job.status, ExportJobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_job_ids_unique() {
        let a = ExportJob::new("d", "c");
        let b = ExportJob::new("d", "c");
        assert_ne!(a.job_id, b.job_id);
    }

    #[test]
    fn test_status_transitions() {
        let mut job = ExportJob::new("design-123", "export");

        job.start();
        assert_eq!(job.status, ExportJobStatus::Processing);
        assert_eq!(job.progress, 10);

        job.complete(vec!["https://cdn.example.com/a.mp4".to_string()], None);
        assert_eq!(job.status, ExportJobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.is_terminal());
    }

    #[test]
    fn test_failure_records_message() {
        let mut job = ExportJob::new("design-123", "export");
        job.start();
        job.fail("export timed out after 120 seconds");

        assert_eq!(job.status, ExportJobStatus::Failed);
        assert!(job.error.as_deref().unwrap().contains("timed out"));
        assert!(job.is_terminal());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "processing".parse::<ExportJobStatus>().unwrap(),
            ExportJobStatus::Processing
        );
        assert!("bogus".parse::<ExportJobStatus>().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let mut job = ExportJob::new("design-123", "export");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "queued");
        // Unset result fields are omitted, not null
        assert!(value.get("download_urls").is_none());
        assert!(value.get("error").is_none());

        job.fail("boom");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "boom");
    }
}
