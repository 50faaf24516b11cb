//! Async export job manager.
//!
//! Decouples slow export work from the request cycle: a job record is
//! created synchronously and visible to polls immediately, then processed
//! in the background under a fixed timeout. The in-memory table is the
//! source of truth; every mutation is optionally mirrored in full to a
//! JSON file so job visibility survives a restart.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use adforge_models::{ExportJob, ExportJobStatus};

use crate::error::{JobError, JobResult};
use crate::exporter::JobExporter;

/// Job manager configuration.
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Mirror the job table to this file on every mutation
    pub persist_path: Option<PathBuf>,
    /// Jobs older than this are swept regardless of status
    pub retention: Duration,
    /// Hard cap on one job's export work
    pub export_timeout: Duration,
    /// Fixed start offset between batch jobs
    pub batch_stagger: Duration,
    /// Sweep cadence
    pub sweep_interval: Duration,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            persist_path: None,
            retention: Duration::from_secs(24 * 60 * 60),
            export_timeout: Duration::from_secs(120),
            batch_stagger: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}

impl JobManagerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            persist_path: std::env::var("EXPORT_JOBS_PERSIST_PATH").ok().map(PathBuf::from),
            retention: Duration::from_secs(
                std::env::var("EXPORT_JOBS_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retention.as_secs()),
            ),
            export_timeout: Duration::from_secs(
                std::env::var("EXPORT_JOB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.export_timeout.as_secs()),
            ),
            batch_stagger: Duration::from_millis(
                std::env::var("EXPORT_JOB_STAGGER_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.batch_stagger.as_millis() as u64),
            ),
            sweep_interval: defaults.sweep_interval,
        }
    }
}

/// A batch submission: the synchronously-created jobs plus the handles of
/// their background tasks.
pub struct BatchExport {
    pub jobs: Vec<ExportJob>,
    pub handles: Vec<JoinHandle<()>>,
}

/// In-memory job table with optional durable mirroring.
#[derive(Clone)]
pub struct ExportJobManager {
    jobs: Arc<RwLock<HashMap<String, ExportJob>>>,
    config: JobManagerConfig,
}

impl ExportJobManager {
    /// Create a manager, rehydrating from the persist file when present.
    ///
    /// A job that was mid-Processing at crash time rehydrates as
    /// Processing and is not resumed; operators treat it as abandoned.
    pub async fn new(config: JobManagerConfig) -> Self {
        let jobs = match &config.persist_path {
            Some(path) if path.exists() => match load_jobs(path).await {
                Ok(loaded) => {
                    info!("Loaded {} export jobs from {}", loaded.len(), path.display());
                    loaded
                }
                Err(e) => {
                    error!("Failed to load export jobs from {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            _ => HashMap::new(),
        };

        Self {
            jobs: Arc::new(RwLock::new(jobs)),
            config,
        }
    }

    /// Create a job record. Returns after the job is visible to lookups
    /// and flushed to storage, before any background work starts.
    pub async fn create_job(
        &self,
        design_id: impl Into<String>,
        campaign: impl Into<String>,
    ) -> ExportJob {
        let job = ExportJob::new(design_id, campaign);

        {
            let mut jobs = self.jobs.write().await;
            jobs.insert(job.job_id.clone(), job.clone());
        }
        self.persist().await;

        info!("Created job {} for design {}", job.job_id, job.design_id);
        job
    }

    /// Look up a job by id.
    pub async fn get_job(&self, job_id: &str) -> Option<ExportJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// List jobs, optionally filtered by status, newest-first.
    pub async fn list_jobs(&self, status: Option<ExportJobStatus>) -> Vec<ExportJob> {
        let jobs = self.jobs.read().await;
        let mut listed: Vec<ExportJob> = jobs
            .values()
            .filter(|job| status.map_or(true, |s| job.status == s))
            .cloned()
            .collect();

        // Tie-break on job id so repeated listings are identical even for
        // jobs created in the same millisecond.
        listed.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.job_id.cmp(&a.job_id))
        });
        listed
    }

    /// Apply a mutation through the manager's update path.
    ///
    /// Terminal jobs are never mutated: a late-arriving result for a job
    /// that already timed out cannot overwrite its Failed state.
    async fn update<F>(&self, job_id: &str, mutate: F) -> JobResult<ExportJob>
    where
        F: FnOnce(&mut ExportJob),
    {
        let updated = {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(job_id)
                .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

            if job.is_terminal() {
                return Err(JobError::Terminal {
                    job_id: job_id.to_string(),
                    status: job.status,
                });
            }

            mutate(job);
            job.clone()
        };
        self.persist().await;

        debug!("Updated job {}: status={}", updated.job_id, updated.status);
        Ok(updated)
    }

    /// Mark a job as processing.
    pub async fn mark_processing(&self, job_id: &str) -> JobResult<ExportJob> {
        self.update(job_id, |job| job.start()).await
    }

    /// Terminate a job as completed with its download references.
    pub async fn complete_job(
        &self,
        job_id: &str,
        download_urls: Vec<String>,
        thumbnail_url: Option<String>,
    ) -> JobResult<ExportJob> {
        self.update(job_id, |job| job.complete(download_urls, thumbnail_url))
            .await
    }

    /// Terminate a job as failed.
    pub async fn fail_job(&self, job_id: &str, error: impl Into<String>) -> JobResult<ExportJob> {
        let error = error.into();
        warn!("Job {job_id} failed: {error}");
        self.update(job_id, |job| job.fail(error.clone())).await
    }

    /// Process a job: race the export work against the fixed timeout and
    /// terminate the job exactly once.
    ///
    /// Intended to run detached from the request that created the job.
    pub async fn process(&self, job_id: &str, exporter: Arc<dyn JobExporter>) {
        let Some(job) = self.get_job(job_id).await else {
            error!("Job not found: {job_id}");
            return;
        };

        if let Err(e) = self.mark_processing(job_id).await {
            warn!("Job {job_id} not started: {e}");
            return;
        }

        let outcome = match tokio::time::timeout(
            self.config.export_timeout,
            exporter.export(&job.design_id),
        )
        .await
        {
            Err(_) => {
                self.fail_job(
                    job_id,
                    format!(
                        "Export timed out after {} seconds",
                        self.config.export_timeout.as_secs()
                    ),
                )
                .await
            }
            Ok(Err(e)) => self.fail_job(job_id, e.to_string()).await,
            // A nominally successful export with nothing to download is a
            // failure, never Completed.
            Ok(Ok(output)) if output.download_urls.is_empty() => {
                self.fail_job(job_id, "Export completed but no download URLs returned")
                    .await
            }
            Ok(Ok(output)) => {
                self.complete_job(job_id, output.download_urls, output.thumbnail_url)
                    .await
            }
        };

        if let Err(e) = outcome {
            warn!("Job {job_id} outcome not recorded: {e}");
        }
    }

    /// Spawn background processing for a job, returning the task handle.
    pub fn spawn_process(&self, job_id: String, exporter: Arc<dyn JobExporter>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            manager.process(&job_id, exporter).await;
        })
    }

    /// Create one job per design id synchronously, then schedule their
    /// background processing with a fixed per-index start offset so the
    /// batch does not burst the remote API.
    pub async fn create_batch(
        &self,
        design_ids: Vec<String>,
        campaign: &str,
        exporter: Arc<dyn JobExporter>,
    ) -> BatchExport {
        let mut jobs = Vec::with_capacity(design_ids.len());
        for design_id in design_ids {
            jobs.push(self.create_job(design_id, campaign).await);
        }

        let mut handles = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            let manager = self.clone();
            let job_id = job.job_id.clone();
            let exporter = exporter.clone();
            let delay = self.config.batch_stagger * index as u32;
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                manager.process(&job_id, exporter).await;
            }));
        }

        BatchExport { jobs, handles }
    }

    /// Delete jobs older than the retention window, regardless of status.
    pub async fn sweep_expired(&self) -> usize {
        let cutoff =
            Utc::now() - chrono::Duration::milliseconds(self.config.retention.as_millis() as i64);

        let removed = {
            let mut jobs = self.jobs.write().await;
            let before = jobs.len();
            jobs.retain(|_, job| job.created_at >= cutoff);
            before - jobs.len()
        };

        if removed > 0 {
            info!("Cleaned up {removed} old export jobs");
            self.persist().await;
        }
        removed
    }

    /// Spawn the periodic sweep loop and return its handle.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        let manager = self.clone();
        let period = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                manager.sweep_expired().await;
            }
        })
    }

    /// Flush the full table to the persist path, if configured.
    ///
    /// Persistence failures are logged and never fail the mutation that
    /// triggered them.
    pub async fn persist(&self) {
        let Some(path) = &self.config.persist_path else {
            return;
        };

        let entries: Vec<(String, ExportJob)> = {
            let jobs = self.jobs.read().await;
            let mut entries: Vec<_> = jobs
                .iter()
                .map(|(id, job)| (id.clone(), job.clone()))
                .collect();
            entries.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at).then_with(|| a.0.cmp(&b.0)));
            entries
        };

        match serde_json::to_string_pretty(&entries) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(path, json).await {
                    error!("Failed to persist export jobs: {e}");
                }
            }
            Err(e) => error!("Failed to serialize export jobs: {e}"),
        }
    }

    #[cfg(test)]
    async fn insert_raw(&self, job: ExportJob) {
        self.jobs.write().await.insert(job.job_id.clone(), job);
    }
}

/// Load the persisted job table.
async fn load_jobs(path: &std::path::Path) -> JobResult<HashMap<String, ExportJob>> {
    let data = tokio::fs::read_to_string(path).await?;
    let entries: Vec<(String, ExportJob)> = serde_json::from_str(&data)?;
    Ok(entries.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::JobExportOutput;
    use adforge_providers::{ProviderError, ProviderResult};
    use async_trait::async_trait;

    enum StubBehavior {
        Urls(Vec<String>),
        Empty,
        Error(String),
        Slow(Duration, Vec<String>),
    }

    struct StubJobExporter {
        behavior: StubBehavior,
    }

    #[async_trait]
    impl JobExporter for StubJobExporter {
        async fn export(&self, _design_id: &str) -> ProviderResult<JobExportOutput> {
            match &self.behavior {
                StubBehavior::Urls(urls) => Ok(JobExportOutput {
                    download_urls: urls.clone(),
                    thumbnail_url: None,
                }),
                StubBehavior::Empty => Ok(JobExportOutput {
                    download_urls: Vec::new(),
                    thumbnail_url: None,
                }),
                StubBehavior::Error(message) => {
                    Err(ProviderError::export_failed(message.clone()))
                }
                StubBehavior::Slow(delay, urls) => {
                    tokio::time::sleep(*delay).await;
                    Ok(JobExportOutput {
                        download_urls: urls.clone(),
                        thumbnail_url: None,
                    })
                }
            }
        }
    }

    fn exporter(behavior: StubBehavior) -> Arc<dyn JobExporter> {
        Arc::new(StubJobExporter { behavior })
    }

    async fn manager() -> ExportJobManager {
        ExportJobManager::new(JobManagerConfig::default()).await
    }

    #[tokio::test]
    async fn test_job_visible_immediately_after_creation() {
        let manager = manager().await;
        let job = manager.create_job("design-1", "launch").await;

        let fetched = manager.get_job(&job.job_id).await.unwrap();
        assert_eq!(fetched.status, ExportJobStatus::Queued);
        assert_eq!(fetched.progress, 0);
        assert_eq!(fetched.design_id, "design-1");
    }

    #[tokio::test]
    async fn test_process_success() {
        let manager = manager().await;
        let job = manager.create_job("design-1", "launch").await;

        manager
            .process(
                &job.job_id,
                exporter(StubBehavior::Urls(vec!["https://cdn.test/a.mp4".to_string()])),
            )
            .await;

        let done = manager.get_job(&job.job_id).await.unwrap();
        assert_eq!(done.status, ExportJobStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(
            done.download_urls.unwrap(),
            vec!["https://cdn.test/a.mp4".to_string()]
        );
    }

    #[tokio::test]
    async fn test_process_with_no_urls_fails() {
        let manager = manager().await;
        let job = manager.create_job("design-1", "launch").await;

        manager.process(&job.job_id, exporter(StubBehavior::Empty)).await;

        let done = manager.get_job(&job.job_id).await.unwrap();
        assert_eq!(done.status, ExportJobStatus::Failed);
        assert!(done.error.unwrap().contains("no download URLs"));
    }

    #[tokio::test]
    async fn test_process_error_fails_job() {
        let manager = manager().await;
        let job = manager.create_job("design-1", "launch").await;

        manager
            .process(
                &job.job_id,
                exporter(StubBehavior::Error("render exploded".to_string())),
            )
            .await;

        let done = manager.get_job(&job.job_id).await.unwrap();
        assert_eq!(done.status, ExportJobStatus::Failed);
        assert!(done.error.unwrap().contains("render exploded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_with_identifying_message() {
        let config = JobManagerConfig {
            export_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let manager = ExportJobManager::new(config).await;
        let job = manager.create_job("design-1", "launch").await;

        manager
            .process(
                &job.job_id,
                exporter(StubBehavior::Slow(
                    Duration::from_secs(600),
                    vec!["https://cdn.test/late.mp4".to_string()],
                )),
            )
            .await;

        let done = manager.get_job(&job.job_id).await.unwrap();
        assert_eq!(done.status, ExportJobStatus::Failed);
        assert!(done.error.unwrap().contains("timed out"));
        // The slow export's result never lands
        assert!(done.download_urls.is_none());
    }

    #[tokio::test]
    async fn test_terminal_state_cannot_be_overwritten() {
        let manager = manager().await;
        let job = manager.create_job("design-1", "launch").await;

        manager.mark_processing(&job.job_id).await.unwrap();
        manager.fail_job(&job.job_id, "timed out").await.unwrap();

        // A late-arriving success must not resurrect the job
        let err = manager
            .complete_job(&job.job_id, vec!["https://cdn.test/late.mp4".to_string()], None)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Terminal { .. }));

        let done = manager.get_job(&job.job_id).await.unwrap();
        assert_eq!(done.status, ExportJobStatus::Failed);
        assert!(done.download_urls.is_none());
    }

    #[tokio::test]
    async fn test_list_jobs_newest_first_and_idempotent() {
        let manager = manager().await;
        for i in 0..3 {
            manager.create_job(format!("design-{i}"), "launch").await;
        }

        let first = manager.list_jobs(None).await;
        let second = manager.list_jobs(None).await;
        assert_eq!(first.len(), 3);

        // Identical ordered list without intervening mutations
        let ids: Vec<_> = first.iter().map(|j| j.job_id.clone()).collect();
        let ids_again: Vec<_> = second.iter().map(|j| j.job_id.clone()).collect();
        assert_eq!(ids, ids_again);

        // Newest first
        for pair in first.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_list_jobs_status_filter() {
        let manager = manager().await;
        let a = manager.create_job("design-a", "launch").await;
        let _b = manager.create_job("design-b", "launch").await;

        manager.mark_processing(&a.job_id).await.unwrap();

        let processing = manager.list_jobs(Some(ExportJobStatus::Processing)).await;
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].job_id, a.job_id);

        let queued = manager.list_jobs(Some(ExportJobStatus::Queued)).await;
        assert_eq!(queued.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_jobs_visible_immediately() {
        let manager = manager().await;

        let batch = manager
            .create_batch(
                vec![
                    "design-1".to_string(),
                    "design-2".to_string(),
                    "design-3".to_string(),
                ],
                "batch-export",
                exporter(StubBehavior::Slow(
                    Duration::from_secs(1),
                    vec!["https://cdn.test/a.mp4".to_string()],
                )),
            )
            .await;

        // All jobs listable right after the batch call returns, none missing
        assert_eq!(batch.jobs.len(), 3);
        let listed = manager.list_jobs(None).await;
        assert_eq!(listed.len(), 3);
        for job in &listed {
            assert!(matches!(
                job.status,
                ExportJobStatus::Queued | ExportJobStatus::Processing
            ));
        }

        // After the staggered tasks run, every job terminates
        for handle in batch.handles {
            handle.await.unwrap();
        }
        let listed = manager.list_jobs(None).await;
        assert!(listed.iter().all(|j| j.status == ExportJobStatus::Completed));
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_jobs_regardless_of_status() {
        let manager = manager().await;
        let keep = manager.create_job("design-fresh", "launch").await;

        let mut old = ExportJob::new("design-old", "launch");
        old.created_at = Utc::now() - chrono::Duration::hours(25);
        old.complete(vec!["https://cdn.test/old.mp4".to_string()], None);
        let old_id = old.job_id.clone();
        manager.insert_raw(old).await;

        let removed = manager.sweep_expired().await;
        assert_eq!(removed, 1);
        assert!(manager.get_job(&old_id).await.is_none());
        assert!(manager.get_job(&keep.job_id).await.is_some());
    }

    #[tokio::test]
    async fn test_persistence_roundtrip_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let persist_path = dir.path().join("export-jobs.json");
        let config = JobManagerConfig {
            persist_path: Some(persist_path.clone()),
            ..Default::default()
        };

        let manager = ExportJobManager::new(config.clone()).await;
        let queued = manager.create_job("design-1", "launch").await;
        let processing = manager.create_job("design-2", "launch").await;
        manager.mark_processing(&processing.job_id).await.unwrap();

        // File holds [job_id, job] pairs
        let raw = std::fs::read_to_string(&persist_path).unwrap();
        let entries: Vec<(String, ExportJob)> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 2);

        // A fresh manager rehydrates the table; the mid-Processing job is
        // still Processing, not resumed
        let restarted = ExportJobManager::new(config).await;
        let job = restarted.get_job(&queued.job_id).await.unwrap();
        assert_eq!(job.status, ExportJobStatus::Queued);
        let job = restarted.get_job(&processing.job_id).await.unwrap();
        assert_eq!(job.status, ExportJobStatus::Processing);
    }
}
