//! Export function contract for background jobs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use adforge_models::ExportFormat;
use adforge_providers::{
    DesignExporter, ExportRequest, ProviderError, ProviderResult, DEFAULT_VIDEO_QUALITY,
};

/// What a finished export hands back to the job manager.
#[derive(Debug, Clone)]
pub struct JobExportOutput {
    pub download_urls: Vec<String>,
    pub thumbnail_url: Option<String>,
}

/// Capability contract for the export-and-retrieve work a job performs.
#[async_trait]
pub trait JobExporter: Send + Sync {
    async fn export(&self, design_id: &str) -> ProviderResult<JobExportOutput>;
}

/// CDN-only exporter: returns provider CDN URLs directly, no server-side
/// downloads. The stable, preferred path for job-based exports.
pub struct CdnExporter {
    exporter: Arc<dyn DesignExporter>,
    format: ExportFormat,
    quality: String,
}

impl CdnExporter {
    pub fn new(exporter: Arc<dyn DesignExporter>) -> Self {
        Self {
            exporter,
            format: ExportFormat::Mp4,
            quality: DEFAULT_VIDEO_QUALITY.to_string(),
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }
}

#[async_trait]
impl JobExporter for CdnExporter {
    async fn export(&self, design_id: &str) -> ProviderResult<JobExportOutput> {
        info!("CDN export for design {design_id}");

        let request = ExportRequest::cdn_only(self.format).with_quality(self.quality.clone());
        let artifact = self.exporter.export(design_id, &request).await?;

        if artifact.remote_urls.is_empty() {
            return Err(ProviderError::export_failed("no CDN URLs returned from export"));
        }

        info!("Got {} CDN URL(s)", artifact.remote_urls.len());
        Ok(JobExportOutput {
            download_urls: artifact.remote_urls,
            thumbnail_url: None,
        })
    }
}
