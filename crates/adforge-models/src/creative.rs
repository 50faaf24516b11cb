//! Creative artifacts produced by the pipeline stages.

use std::collections::BTreeMap;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Template field values for one creative (headline, cta, image reference, ...).
///
/// Ordered so that serialized specs and manifests are deterministic.
pub type CreativeFields = BTreeMap<String, String>;

/// Export formats supported by the design provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Mp4,
    Gif,
    Png,
    Jpg,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Gif => "gif",
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
        }
    }

    /// File extension for downloaded artifacts.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Whether this format is an image (thumbnail) rather than a video.
    pub fn is_image(&self) -> bool {
        matches!(self, ExportFormat::Png | ExportFormat::Jpg)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handle to a rendered creative, returned by the generation provider.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedCreative {
    /// Opaque design identifier understood by the export provider
    pub design_id: String,
    /// Editor/preview URL for the design
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_url: Option<String>,
}

/// Synthesized voiceover audio plus timing metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VoiceoverArtifact {
    /// Local path of the audio file
    pub file_path: PathBuf,
    /// The script that was spoken
    pub script: String,
    /// Number of words in the script
    pub word_count: u32,
    /// Estimated spoken duration (~150 words/minute, not measured)
    pub estimated_duration_secs: f64,
    /// Voice used for synthesis
    pub voice_id: String,
}

impl VoiceoverArtifact {
    /// Estimate spoken duration for a script at ~150 words per minute.
    pub fn estimate_duration(script: &str) -> (u32, f64) {
        let word_count = script.split_whitespace().count() as u32;
        (word_count, f64::from(word_count) / 150.0 * 60.0)
    }
}

/// Result of exporting a design: local downloads and/or CDN URLs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportArtifact {
    pub design_id: String,
    pub format: ExportFormat,
    /// Downloaded file paths (empty in CDN-only mode)
    #[serde(default)]
    pub local_files: Vec<PathBuf>,
    /// Directly-streamable CDN URLs
    #[serde(default)]
    pub remote_urls: Vec<String>,
}

impl ExportArtifact {
    pub fn first_file(&self) -> Option<&PathBuf> {
        self.local_files.first()
    }

    pub fn first_url(&self) -> Option<&String> {
        self.remote_urls.first()
    }
}

/// Output of the audio/video merge stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MergedVideo {
    /// Path of the merged file
    pub output_path: PathBuf,
    /// Audio fade-in applied (seconds)
    pub fade_in: f64,
    /// Audio fade-out applied (seconds)
    pub fade_out: f64,
    /// Probed video input duration, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,
    /// Probed audio input duration, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,
    /// Size of the merged file in megabytes
    pub file_size_mb: f64,
}

/// Accumulating record for one variation's pipeline run.
///
/// Created empty at pipeline start and mutated in place by each stage.
/// `success` means the creative-generation stage succeeded; export,
/// thumbnail, and merge failures are recorded as degradations without
/// flipping it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreativeResult {
    /// 1-based variation index within the campaign
    pub index: u32,
    /// True once creative generation succeeded
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative: Option<GeneratedCreative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiceover: Option<VoiceoverArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportArtifact>,
    /// CDN URL of the exported video; cleared once a merged file supersedes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Local path of the primary video (merged file once merge succeeds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_video_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_thumbnail_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_video: Option<MergedVideo>,
    /// Verified presence of an audio stream in the merged file.
    /// Never assumed true: stays false on verification failure.
    #[serde(default)]
    pub has_audio_stream: bool,
    /// Fatal creative-generation error (the variation produced nothing)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiceover_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_verification_error: Option<String>,
}

impl CreativeResult {
    /// Create an empty result for the given 1-based variation index.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            success: false,
            creative: None,
            voiceover: None,
            export: None,
            video_url: None,
            local_video_path: None,
            thumbnail_url: None,
            local_thumbnail_path: None,
            merged_video: None,
            has_audio_stream: false,
            error: None,
            voiceover_error: None,
            export_error: None,
            merge_error: None,
            audio_verification_error: None,
        }
    }

    /// Create a failed result for a variation whose pipeline never completed.
    pub fn failed(index: u32, error: impl Into<String>) -> Self {
        let mut result = Self::new(index);
        result.error = Some(error.into());
        result
    }

    /// Record a successful merge: the merged file becomes the primary video
    /// reference and any CDN URL for the silent original is cleared.
    pub fn apply_merged(&mut self, merged: MergedVideo) {
        self.local_video_path = Some(merged.output_path.clone());
        self.video_url = None;
        self.merged_video = Some(merged);
    }
}
