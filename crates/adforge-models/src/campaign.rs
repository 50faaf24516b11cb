//! Campaign specs, variation expansion, and the persisted manifest.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::creative::{CreativeFields, CreativeResult};

/// One creative request within a campaign: field values plus an optional
/// voiceover script. Immutable; consumed once by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Variation {
    pub creative_data: CreativeFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiceover_script: Option<String>,
}

/// Campaign parameters as submitted by the caller.
///
/// Variations may be given explicitly, or expanded from shared base data
/// plus a list of A/B scripts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CampaignSpec {
    pub name: String,
    pub template_id: String,
    #[serde(default)]
    pub variations: Vec<Variation>,
    #[serde(default)]
    pub base_creative_data: CreativeFields,
    #[serde(default)]
    pub voiceover_scripts: Vec<String>,
}

impl CampaignSpec {
    /// Build the effective variation list.
    ///
    /// Precedence: an explicit `variations` array wins; else each script in
    /// `voiceover_scripts` becomes one variation sharing `base_creative_data`;
    /// else a single variation with the base data and no script.
    pub fn effective_variations(&self) -> Vec<Variation> {
        if !self.variations.is_empty() {
            return self.variations.clone();
        }

        if !self.voiceover_scripts.is_empty() {
            return self
                .voiceover_scripts
                .iter()
                .map(|script| Variation {
                    creative_data: self.base_creative_data.clone(),
                    voiceover_script: Some(script.clone()),
                })
                .collect();
        }

        vec![Variation {
            creative_data: self.base_creative_data.clone(),
            voiceover_script: None,
        }]
    }
}

/// Per-campaign success counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CampaignSummary {
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
}

/// Durable summary of one campaign run. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CampaignManifest {
    pub campaign: String,
    pub template_id: String,
    pub directory: PathBuf,
    pub creatives: Vec<CreativeResult>,
    pub summary: CampaignSummary,
}

impl CampaignManifest {
    /// Assemble a manifest from the finished per-variation results.
    ///
    /// "Successful" counts variations whose creative-generation stage
    /// succeeded; later-stage degradations do not flip a result to failed.
    pub fn from_results(
        campaign: impl Into<String>,
        template_id: impl Into<String>,
        directory: impl Into<PathBuf>,
        creatives: Vec<CreativeResult>,
    ) -> Self {
        let total = creatives.len() as u32;
        let successful = creatives.iter().filter(|c| c.success).count() as u32;
        Self {
            campaign: campaign.into(),
            template_id: template_id.into(),
            directory: directory.into(),
            creatives,
            summary: CampaignSummary {
                total,
                successful,
                failed: total - successful,
            },
        }
    }
}
