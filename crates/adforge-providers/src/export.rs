//! Design export client: render a design and retrieve it as local files
//! or CDN URLs.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use adforge_models::{ExportArtifact, ExportFormat};

use crate::credentials::DesignToken;
use crate::error::{ProviderError, ProviderResult};
use crate::http::expect_json;

const POLL_INTERVAL: Duration = Duration::from_secs(3);
const POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default quality for video exports.
pub const DEFAULT_VIDEO_QUALITY: &str = "horizontal_1080p";

/// How the exported files are retrieved.
///
/// CDN-only skips the redundant server-side download and is preferred for
/// latency-sensitive flows; Download materializes local files for
/// downstream processing (e.g. the merge stage).
#[derive(Debug, Clone)]
pub enum RetrievalMode {
    Download {
        output_dir: PathBuf,
        filename: Option<String>,
    },
    CdnOnly,
}

/// Parameters for one export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub quality: Option<String>,
    pub mode: RetrievalMode,
}

impl ExportRequest {
    pub fn cdn_only(format: ExportFormat) -> Self {
        Self {
            format,
            quality: None,
            mode: RetrievalMode::CdnOnly,
        }
    }

    pub fn download(format: ExportFormat, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            format,
            quality: None,
            mode: RetrievalMode::Download {
                output_dir: output_dir.into(),
                filename: None,
            },
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        if let RetrievalMode::Download { filename, .. } = &mut self.mode {
            *filename = Some(name.into());
        }
        self
    }
}

/// Capability contract: render a design into downloadable assets.
#[async_trait]
pub trait DesignExporter: Send + Sync {
    async fn export(
        &self,
        design_id: &str,
        request: &ExportRequest,
    ) -> ProviderResult<ExportArtifact>;
}

/// Export API client with internal job polling.
pub struct ExportApiClient {
    http: Client,
    token: DesignToken,
    base_url: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct CreateExportRequest<'a> {
    design_id: &'a str,
    format: ExportFormatSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ExportFormatSpec<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ExportEnvelope {
    job: ExportJobBody,
}

#[derive(Debug, Deserialize)]
struct ExportJobBody {
    id: String,
    status: Option<String>,
    result: Option<ExportResultBody>,
    error: Option<ExportErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ExportResultBody {
    #[serde(default)]
    urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ExportErrorBody {
    message: Option<String>,
}

impl ExportApiClient {
    pub fn new(token: DesignToken) -> Self {
        Self {
            http: Client::new(),
            token,
            base_url: crate::creative::DEFAULT_DESIGN_API_BASE.to_string(),
            poll_interval: POLL_INTERVAL,
            poll_timeout: POLL_TIMEOUT,
        }
    }

    /// Override the API base URL (tests, self-hosted gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    async fn create_export(
        &self,
        design_id: &str,
        request: &ExportRequest,
    ) -> ProviderResult<String> {
        // Video exports need a resolution-based quality value
        let quality = match request.format {
            ExportFormat::Mp4 => Some(request.quality.as_deref().unwrap_or(DEFAULT_VIDEO_QUALITY)),
            _ => request.quality.as_deref(),
        };

        let body = CreateExportRequest {
            design_id,
            format: ExportFormatSpec {
                kind: request.format.as_str(),
                quality,
            },
        };

        let response = self
            .http
            .post(format!("{}/exports", self.base_url))
            .bearer_auth(self.token.as_str())
            .json(&body)
            .send()
            .await?;

        let envelope: ExportEnvelope = expect_json(response).await?;
        info!(
            "Export job {} created for design {} as {}",
            envelope.job.id, design_id, request.format
        );
        Ok(envelope.job.id)
    }

    async fn wait_for_export(&self, job_id: &str) -> ProviderResult<Vec<String>> {
        let deadline = Instant::now() + self.poll_timeout;

        loop {
            let response = self
                .http
                .get(format!("{}/exports/{}", self.base_url, job_id))
                .bearer_auth(self.token.as_str())
                .send()
                .await?;
            let envelope: ExportEnvelope = expect_json(response).await?;
            let job = envelope.job;

            match job.status.as_deref() {
                Some("completed") | Some("success") => {
                    let urls = job.result.map(|r| r.urls).unwrap_or_default();
                    info!("Export completed, {} file(s) ready", urls.len());
                    return Ok(urls);
                }
                Some("failed") => {
                    let message = job
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| "unknown error".to_string());
                    return Err(ProviderError::export_failed(message));
                }
                status => {
                    debug!("Export job {} status: {:?}", job_id, status);
                }
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(ProviderError::ExportTimeout {
                    waited_secs: self.poll_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn download_url(&self, url: &str, output_path: &std::path::Path) -> ProviderResult<()> {
        debug!("Downloading {} -> {}", url, output_path.display());

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::api(
                status.as_u16(),
                format!("download failed for {url}"),
            ));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(output_path, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl DesignExporter for ExportApiClient {
    async fn export(
        &self,
        design_id: &str,
        request: &ExportRequest,
    ) -> ProviderResult<ExportArtifact> {
        let job_id = self.create_export(design_id, request).await?;
        let urls = self.wait_for_export(&job_id).await?;

        let local_files = match &request.mode {
            RetrievalMode::CdnOnly => Vec::new(),
            RetrievalMode::Download {
                output_dir,
                filename,
            } => {
                tokio::fs::create_dir_all(output_dir).await?;
                let mut files = Vec::with_capacity(urls.len());
                for (i, url) in urls.iter().enumerate() {
                    let name = match filename {
                        Some(name) => name.clone(),
                        None => format!("{}_{}.{}", design_id, i + 1, request.format.extension()),
                    };
                    let output_path = output_dir.join(name);
                    self.download_url(url, &output_path).await?;
                    files.push(output_path);
                }
                files
            }
        };

        Ok(ExportArtifact {
            design_id: design_id.to_string(),
            format: request.format,
            local_files,
            remote_urls: urls,
        })
    }
}
