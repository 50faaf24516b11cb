//! Campaign orchestrator: run the single-creative pipeline across all
//! variations, serially, and persist the manifest.

use adforge_models::{CampaignManifest, CampaignSpec, CreativeResult};
use tracing::{error, info};

use crate::context::PipelineContext;
use crate::error::PipelineResult;
use crate::single::run_single_creative;
use crate::workspace::CampaignWorkspace;

/// Run a full campaign.
///
/// Variations run strictly serially in index order with a pacing delay
/// between them (not after the last), keeping the remote APIs under their
/// rate limits and the generated-file ordering deterministic. An error
/// escaping one variation is recorded as a failed result; the remaining
/// variations always run.
pub async fn run_campaign(
    ctx: &PipelineContext,
    spec: &CampaignSpec,
) -> PipelineResult<CampaignManifest> {
    let variations = spec.effective_variations();
    let total = variations.len();

    info!(
        campaign = %spec.name,
        template = %spec.template_id,
        variations = total,
        "Starting campaign"
    );

    let workspace = CampaignWorkspace::create(&ctx.config.output_dir, &spec.name).await?;

    let mut creatives = Vec::with_capacity(total);
    for (i, variation) in variations.iter().enumerate() {
        let index = (i + 1) as u32;
        info!("--- Variation {index}/{total} ---");

        match run_single_creative(ctx, &spec.template_id, variation, &workspace, index).await {
            Ok(result) => creatives.push(result),
            Err(e) => {
                error!("Variation {index} failed: {e}");
                workspace.write_error_file(index, &e.to_string()).await;
                creatives.push(CreativeResult::failed(index, e.to_string()));
            }
        }

        if i + 1 < total {
            tokio::time::sleep(ctx.config.pacing_delay).await;
        }
    }

    let manifest = CampaignManifest::from_results(
        &spec.name,
        &spec.template_id,
        workspace.root(),
        creatives,
    );
    workspace.write_manifest(&manifest).await?;

    info!(
        campaign = %spec.name,
        successful = manifest.summary.successful,
        total = manifest.summary.total,
        "Campaign complete"
    );

    Ok(manifest)
}
