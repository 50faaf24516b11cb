//! Single-creative pipeline: generate -> voiceover -> export -> thumbnail
//! -> merge -> verify, for one variation.
//!
//! Only creative generation is fatal to the variation. Every later stage
//! records its failure and lets the rest of the pipeline continue, so a
//! campaign degrades instead of aborting.

use adforge_media::MergeOptions;
use adforge_models::{CreativeResult, ExportFormat, MergedVideo, Variation};
use adforge_providers::{ExportRequest, VoiceRequest};
use tracing::{info, warn};

use crate::context::PipelineContext;
use crate::error::PipelineResult;
use crate::stage::StageOutcome;
use crate::workspace::CampaignWorkspace;

/// Run all stages for one variation and return the accumulated result.
///
/// `result.success` is set as soon as generation succeeds and is never
/// revoked by later stages: it means "a creative design exists", not
/// "every enrichment succeeded".
pub async fn run_single_creative(
    ctx: &PipelineContext,
    template_id: &str,
    variation: &Variation,
    workspace: &CampaignWorkspace,
    variant_index: u32,
) -> PipelineResult<CreativeResult> {
    let mut result = CreativeResult::new(variant_index);

    info!(variant = variant_index, "Step 1: creating creative from template");
    let design_id = match ctx
        .creative
        .generate(template_id, &variation.creative_data)
        .await
    {
        Ok(creative) => {
            info!(variant = variant_index, "Creative created: {}", creative.design_id);
            let design_id = creative.design_id.clone();
            result.creative = Some(creative);
            result.success = true;
            design_id
        }
        Err(e) => {
            warn!(variant = variant_index, "Creative generation failed: {e}");
            result.error = Some(e.to_string());
            return Ok(result);
        }
    };

    let outcome = stage_voiceover(ctx, &mut result, variation, &design_id, workspace).await;
    info!(variant = variant_index, "Step 2 voiceover: {outcome}");

    let outcome = stage_export(ctx, &mut result, &design_id, workspace).await;
    info!(variant = variant_index, "Step 3 export: {outcome}");

    let outcome = stage_thumbnail(ctx, &mut result, &design_id, workspace).await;
    info!(variant = variant_index, "Step 4 thumbnail: {outcome}");

    let outcome = stage_merge_and_verify(ctx, &mut result, &design_id, workspace).await;
    info!(variant = variant_index, "Step 5 merge: {outcome}");

    Ok(result)
}

/// Synthesize the voiceover when a script was supplied.
///
/// A missing voice credential skips the stage with a notice; an API
/// failure degrades the variation and is durably recorded.
async fn stage_voiceover(
    ctx: &PipelineContext,
    result: &mut CreativeResult,
    variation: &Variation,
    design_id: &str,
    workspace: &CampaignWorkspace,
) -> StageOutcome {
    let Some(script) = variation.voiceover_script.as_deref() else {
        return StageOutcome::skipped("no voiceover script");
    };

    let Some(voice) = ctx.voice.as_ref() else {
        warn!("Voiceover script provided but no voice credential configured - skipping audio");
        return StageOutcome::skipped("voice credential not configured");
    };

    let request = VoiceRequest {
        voice_id: ctx.config.voice_id.clone(),
        output_dir: workspace.voiceovers_dir(),
        file_prefix: format!("vo_{}", id_suffix(design_id, 8)),
    };

    match voice.synthesize(script, &request).await {
        Ok(artifact) => {
            info!("Voiceover generated: {}", artifact.file_path.display());
            result.voiceover = Some(artifact);
            StageOutcome::Completed
        }
        Err(e) => {
            let message = format!("Voiceover generation failed: {e}");
            workspace.write_error_file(result.index, &message).await;
            result.voiceover_error = Some(message.clone());
            StageOutcome::degraded(message)
        }
    }
}

/// Export the primary video and download it into the campaign namespace.
async fn stage_export(
    ctx: &PipelineContext,
    result: &mut CreativeResult,
    design_id: &str,
    workspace: &CampaignWorkspace,
) -> StageOutcome {
    let request = ExportRequest::download(ctx.config.export_format, workspace.videos_dir())
        .with_quality(ctx.config.export_quality.clone());

    match ctx.exporter.export(design_id, &request).await {
        Ok(artifact) => {
            result.video_url = artifact.first_url().cloned();
            result.local_video_path = artifact.first_file().cloned();
            result.export = Some(artifact);
            StageOutcome::Completed
        }
        Err(e) => {
            let message = e.to_string();
            result.export_error = Some(message.clone());
            StageOutcome::degraded(message)
        }
    }
}

/// Export a still image as thumbnail. Failures are logged and ignored;
/// nothing downstream depends on the thumbnail.
async fn stage_thumbnail(
    ctx: &PipelineContext,
    result: &mut CreativeResult,
    design_id: &str,
    workspace: &CampaignWorkspace,
) -> StageOutcome {
    let request = ExportRequest::download(ExportFormat::Png, workspace.thumbnails_dir())
        .with_filename(format!("{design_id}_thumb.png"));

    match ctx.exporter.export(design_id, &request).await {
        Ok(artifact) => {
            result.thumbnail_url = artifact.first_url().cloned();
            result.local_thumbnail_path = artifact.first_file().cloned();
            StageOutcome::Completed
        }
        Err(e) => {
            warn!("Thumbnail export failed: {e}");
            StageOutcome::degraded(e.to_string())
        }
    }
}

/// Merge video and voiceover, then verify the merged file's audio stream.
///
/// Runs only when both a voiceover and a downloaded video exist. On
/// success the merged file supersedes the silent original: the local path
/// is replaced and the CDN URL cleared, so callers can never be handed
/// the silent version. On failure the un-merged video remains valid.
async fn stage_merge_and_verify(
    ctx: &PipelineContext,
    result: &mut CreativeResult,
    design_id: &str,
    workspace: &CampaignWorkspace,
) -> StageOutcome {
    let (Some(voiceover_path), Some(video_path)) = (
        result.voiceover.as_ref().map(|v| v.file_path.clone()),
        result.local_video_path.clone(),
    ) else {
        return StageOutcome::skipped("missing voiceover or local video");
    };

    if !ctx.merger.is_available().await {
        info!("Media tool not available - skipping merge");
        return StageOutcome::skipped("media tool not available");
    }

    let options = MergeOptions {
        output_dir: Some(workspace.videos_dir()),
        filename: Some(format!("{design_id}_final.mp4")),
        fade_in: ctx.config.fade_in,
        fade_out: ctx.config.fade_out,
        ..Default::default()
    };

    let merge = match ctx.merger.merge(&video_path, &voiceover_path, &options).await {
        Ok(merge) => merge,
        Err(e) => {
            let message = format!("Merge error: {e}");
            workspace.write_error_file(result.index, &message).await;
            result.merge_error = Some(message.clone());
            return StageOutcome::degraded(message);
        }
    };

    info!("Merged video: {}", merge.output_path.display());
    let merged_path = merge.output_path.clone();
    result.apply_merged(MergedVideo {
        output_path: merge.output_path,
        fade_in: ctx.config.fade_in,
        fade_out: ctx.config.fade_out,
        video_duration: merge.metadata.video_duration,
        audio_duration: merge.metadata.audio_duration,
        file_size_mb: merge.metadata.file_size_mb,
    });

    // Verification only runs on a merged file, and never assumes audio is
    // present: a probe failure leaves has_audio_stream false.
    match ctx.merger.verify_audio(&merged_path).await {
        Ok(info) => {
            result.has_audio_stream = info.has_audio;
            if !info.has_audio {
                warn!("Merged file has no audio stream: {}", merged_path.display());
            }
        }
        Err(e) => {
            warn!("Audio verification failed: {e}");
            result.audio_verification_error = Some(e.to_string());
            result.has_audio_stream = false;
        }
    }

    StageOutcome::Completed
}

/// Last `n` characters of an identifier, for filename prefixes.
fn id_suffix(id: &str, n: usize) -> &str {
    match id.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((start, _)) => &id[start..],
        None => id,
    }
}
