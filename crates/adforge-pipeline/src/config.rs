//! Campaign configuration.

use std::path::PathBuf;
use std::time::Duration;

use adforge_models::ExportFormat;
use adforge_providers::DEFAULT_VOICE_ID;

/// Tunables for campaign runs.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// Root directory under which campaign namespaces are created
    pub output_dir: PathBuf,
    /// Voice used for all voiceovers in the campaign
    pub voice_id: String,
    /// Primary video export format
    pub export_format: ExportFormat,
    /// Export quality for the primary video
    pub export_quality: String,
    /// Delay between variations (backpressure for the remote APIs)
    pub pacing_delay: Duration,
    /// Audio fade-in applied by the merge stage (seconds)
    pub fade_in: f64,
    /// Audio fade-out applied by the merge stage (seconds)
    pub fade_out: f64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./campaigns"),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            export_format: ExportFormat::Mp4,
            export_quality: "horizontal_1080p".to_string(),
            pacing_delay: Duration::from_secs(2),
            fade_in: 0.3,
            fade_out: 0.5,
        }
    }
}

impl CampaignConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_dir: std::env::var("CAMPAIGN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            voice_id: std::env::var("CAMPAIGN_VOICE_ID").unwrap_or(defaults.voice_id),
            export_format: defaults.export_format,
            export_quality: std::env::var("CAMPAIGN_EXPORT_QUALITY")
                .unwrap_or(defaults.export_quality),
            pacing_delay: Duration::from_millis(
                std::env::var("CAMPAIGN_PACING_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.pacing_delay.as_millis() as u64),
            ),
            fade_in: std::env::var("CAMPAIGN_FADE_IN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fade_in),
            fade_out: std::env::var("CAMPAIGN_FADE_OUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fade_out),
        }
    }
}
