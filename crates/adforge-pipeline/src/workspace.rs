//! Campaign output namespace on disk.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info};

use adforge_models::CampaignManifest;

use crate::error::PipelineResult;

const MANIFEST_FILENAME: &str = "campaign-manifest.json";

/// Directory layout for one campaign run:
/// `<output_dir>/<name>_<date>/{videos,voiceovers,thumbnails,errors,audio}`.
#[derive(Debug, Clone)]
pub struct CampaignWorkspace {
    root: PathBuf,
}

impl CampaignWorkspace {
    /// Create the campaign namespace and its subdirectories.
    pub async fn create(output_dir: &Path, campaign_name: &str) -> PipelineResult<Self> {
        let date = Utc::now().format("%Y-%m-%d");
        let dir_name = sanitize_dir_name(&format!("{campaign_name}_{date}"));
        let root = output_dir.join(dir_name);

        for sub in ["videos", "voiceovers", "thumbnails", "errors", "audio"] {
            tokio::fs::create_dir_all(root.join(sub)).await?;
        }

        info!("Campaign directory: {}", root.display());
        Ok(Self { root })
    }

    /// Open an existing namespace without touching the filesystem.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn voiceovers_dir(&self) -> PathBuf {
        self.root.join("voiceovers")
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join("thumbnails")
    }

    pub fn errors_dir(&self) -> PathBuf {
        self.root.join("errors")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    /// Durably record a per-variant failure, independent of the in-memory
    /// result. Write failures are logged, never propagated.
    pub async fn write_error_file(&self, variant_index: u32, message: &str) {
        let path = self.errors_dir().join(format!("variant_{variant_index}.txt"));
        let content = format!(
            "Variant {variant_index}\nTimestamp: {}\nError: {message}",
            Utc::now().to_rfc3339()
        );

        if let Err(e) = tokio::fs::write(&path, content).await {
            error!("Failed to write error file {}: {}", path.display(), e);
        }
    }

    /// Persist the campaign manifest.
    pub async fn write_manifest(&self, manifest: &CampaignManifest) -> PipelineResult<PathBuf> {
        let path = self.manifest_path();
        let json = serde_json::to_string_pretty(manifest)?;
        tokio::fs::write(&path, json).await?;
        info!("Campaign manifest saved: {}", path.display());
        Ok(path)
    }
}

/// Lowercase and collapse whitespace runs to underscores.
fn sanitize_dir_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
