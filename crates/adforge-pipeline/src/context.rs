//! Injected services for the pipeline.

use std::sync::Arc;

use adforge_media::MergeService;
use adforge_providers::{CreativeGenerator, DesignExporter, VoiceSynthesizer};

use crate::config::CampaignConfig;

/// Explicitly constructed service bundle handed to the orchestrator.
///
/// The voice synthesizer is optional: a campaign with voiceover scripts but
/// no voice credential skips the voiceover stage with a notice instead of
/// failing.
pub struct PipelineContext {
    pub config: CampaignConfig,
    pub creative: Arc<dyn CreativeGenerator>,
    pub voice: Option<Arc<dyn VoiceSynthesizer>>,
    pub exporter: Arc<dyn DesignExporter>,
    pub merger: Arc<dyn MergeService>,
}

impl PipelineContext {
    pub fn new(
        config: CampaignConfig,
        creative: Arc<dyn CreativeGenerator>,
        voice: Option<Arc<dyn VoiceSynthesizer>>,
        exporter: Arc<dyn DesignExporter>,
        merger: Arc<dyn MergeService>,
    ) -> Self {
        Self {
            config,
            creative,
            voice,
            exporter,
            merger,
        }
    }
}
