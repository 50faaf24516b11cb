//! Campaign pipeline integration tests with stub collaborators.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use adforge_media::{
    AudioStreamInfo, MediaError, MediaResult, MergeMetadata, MergeOptions, MergeOutput,
    MergeService,
};
use adforge_models::{
    CampaignSpec, CreativeFields, ExportArtifact, GeneratedCreative, Variation, VoiceoverArtifact,
};
use adforge_pipeline::{run_campaign, CampaignConfig, PipelineContext};
use adforge_providers::{
    CreativeGenerator, DesignExporter, ExportRequest, ProviderError, ProviderResult,
    RetrievalMode, VoiceRequest, VoiceSynthesizer,
};

struct StubGenerator;

#[async_trait]
impl CreativeGenerator for StubGenerator {
    async fn generate(
        &self,
        template_id: &str,
        fields: &CreativeFields,
    ) -> ProviderResult<GeneratedCreative> {
        if fields.contains_key("fail_generation") {
            return Err(ProviderError::generation_failed("synthetic generation failure"));
        }
        let tag = fields
            .get("variant")
            .cloned()
            .unwrap_or_else(|| "base".to_string());
        Ok(GeneratedCreative {
            design_id: format!("design-{tag}"),
            design_url: Some(format!("https://designs.test/{template_id}/{tag}")),
        })
    }
}

struct StubVoice {
    fail: bool,
}

#[async_trait]
impl VoiceSynthesizer for StubVoice {
    async fn synthesize(
        &self,
        text: &str,
        request: &VoiceRequest,
    ) -> ProviderResult<VoiceoverArtifact> {
        if self.fail {
            return Err(ProviderError::synthesis_failed("synthetic voice outage"));
        }
        tokio::fs::create_dir_all(&request.output_dir).await?;
        let file_path = request.output_dir.join(format!("{}.mp3", request.file_prefix));
        tokio::fs::write(&file_path, b"mp3").await?;
        let (word_count, estimated_duration_secs) = VoiceoverArtifact::estimate_duration(text);
        Ok(VoiceoverArtifact {
            file_path,
            script: text.to_string(),
            word_count,
            estimated_duration_secs,
            voice_id: request.voice_id.clone(),
        })
    }
}

struct StubExporter {
    fail: bool,
}

#[async_trait]
impl DesignExporter for StubExporter {
    async fn export(
        &self,
        design_id: &str,
        request: &ExportRequest,
    ) -> ProviderResult<ExportArtifact> {
        if self.fail {
            return Err(ProviderError::export_failed("synthetic export outage"));
        }
        let url = format!("https://cdn.test/{design_id}.{}", request.format.extension());
        let local_files = match &request.mode {
            RetrievalMode::Download {
                output_dir,
                filename,
            } => {
                tokio::fs::create_dir_all(output_dir).await?;
                let name = filename
                    .clone()
                    .unwrap_or_else(|| format!("{design_id}_1.{}", request.format.extension()));
                let path = output_dir.join(name);
                tokio::fs::write(&path, b"bytes").await?;
                vec![path]
            }
            RetrievalMode::CdnOnly => Vec::new(),
        };
        Ok(ExportArtifact {
            design_id: design_id.to_string(),
            format: request.format,
            local_files,
            remote_urls: vec![url],
        })
    }
}

enum MergeBehavior {
    Succeed,
    Fail,
    Unavailable,
}

struct StubMerger {
    behavior: MergeBehavior,
    verify_ok: bool,
}

impl StubMerger {
    fn succeeding() -> Self {
        Self {
            behavior: MergeBehavior::Succeed,
            verify_ok: true,
        }
    }
}

#[async_trait]
impl MergeService for StubMerger {
    async fn is_available(&self) -> bool {
        !matches!(self.behavior, MergeBehavior::Unavailable)
    }

    async fn merge(
        &self,
        video_path: &Path,
        audio_path: &Path,
        options: &MergeOptions,
    ) -> MediaResult<MergeOutput> {
        if matches!(self.behavior, MergeBehavior::Fail) {
            return Err(MediaError::merge_failed(Some(1), "synthetic ffmpeg stderr"));
        }
        let dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| video_path.parent().unwrap().to_path_buf());
        let output_path = dir.join(
            options
                .filename
                .clone()
                .unwrap_or_else(|| "merged.mp4".to_string()),
        );
        tokio::fs::write(&output_path, b"merged").await?;
        Ok(MergeOutput {
            output_path,
            metadata: MergeMetadata {
                video_duration: Some(12.0),
                audio_duration: Some(10.0),
                file_size_mb: 1.0,
                video_source: video_path.to_path_buf(),
                audio_source: audio_path.to_path_buf(),
            },
        })
    }

    async fn verify_audio(&self, _path: &Path) -> MediaResult<AudioStreamInfo> {
        if !self.verify_ok {
            return Err(MediaError::ffprobe_failed("synthetic probe failure", None));
        }
        Ok(AudioStreamInfo {
            has_audio: true,
            codec: Some("aac".to_string()),
            channels: Some(2),
        })
    }
}

fn make_ctx(
    output_dir: &Path,
    voice: Option<StubVoice>,
    exporter: StubExporter,
    merger: StubMerger,
) -> PipelineContext {
    let config = CampaignConfig {
        output_dir: output_dir.to_path_buf(),
        pacing_delay: Duration::ZERO,
        ..Default::default()
    };
    PipelineContext::new(
        config,
        Arc::new(StubGenerator),
        voice.map(|v| Arc::new(v) as Arc<dyn VoiceSynthesizer>),
        Arc::new(exporter),
        Arc::new(merger),
    )
}

fn scripted_spec(scripts: &[&str]) -> CampaignSpec {
    let mut base = CreativeFields::new();
    base.insert("headline".to_string(), "Launch Now".to_string());
    CampaignSpec {
        name: "AB Test".to_string(),
        template_id: "tpl-1".to_string(),
        variations: Vec::new(),
        base_creative_data: base,
        voiceover_scripts: scripts.iter().map(|s| s.to_string()).collect(),
    }
}

fn variation(tag: &str, script: Option<&str>, fail_generation: bool) -> Variation {
    let mut fields = CreativeFields::new();
    fields.insert("variant".to_string(), tag.to_string());
    if fail_generation {
        fields.insert("fail_generation".to_string(), "1".to_string());
    }
    Variation {
        creative_data: fields,
        voiceover_script: script.map(|s| s.to_string()),
    }
}

fn errors_in(manifest_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(manifest_dir.join("errors"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn scripts_expand_into_indexed_variations_with_merged_output() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(
        dir.path(),
        Some(StubVoice { fail: false }),
        StubExporter { fail: false },
        StubMerger::succeeding(),
    );

    let manifest = run_campaign(&ctx, &scripted_spec(&["Script A", "Script B"]))
        .await
        .unwrap();

    assert_eq!(manifest.summary.total, 2);
    assert_eq!(manifest.summary.successful, 2);
    assert_eq!(manifest.summary.failed, 0);
    assert_eq!(manifest.creatives.len(), 2);

    for (i, creative) in manifest.creatives.iter().enumerate() {
        assert_eq!(creative.index, (i + 1) as u32);
        assert!(creative.success);

        // Both variations share the base creative data
        let voiceover = creative.voiceover.as_ref().unwrap();
        assert_eq!(voiceover.script, format!("Script {}", ["A", "B"][i]));

        // Merged file supersedes the CDN-hosted silent original
        let merged = creative.merged_video.as_ref().unwrap();
        assert!(creative.video_url.is_none());
        assert_eq!(creative.local_video_path.as_ref().unwrap(), &merged.output_path);
        assert!(merged.output_path.ends_with("videos/design-base_final.mp4"));
        assert!(creative.has_audio_stream);
    }

    // Manifest persisted verbatim at the deterministic path
    let manifest_path = manifest.directory.join("campaign-manifest.json");
    let loaded: adforge_models::CampaignManifest =
        serde_json::from_str(&std::fs::read_to_string(manifest_path).unwrap()).unwrap();
    assert_eq!(loaded.summary.total, 2);
    assert_eq!(loaded.creatives.len(), 2);

    assert!(errors_in(&manifest.directory).is_empty());
}

#[tokio::test]
async fn generation_failure_is_isolated_to_its_variation() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(
        dir.path(),
        Some(StubVoice { fail: false }),
        StubExporter { fail: false },
        StubMerger::succeeding(),
    );

    let spec = CampaignSpec {
        name: "isolated".to_string(),
        template_id: "tpl-1".to_string(),
        variations: vec![
            variation("one", Some("hello"), false),
            variation("two", Some("world"), true),
            variation("three", Some("again"), false),
        ],
        base_creative_data: CreativeFields::new(),
        voiceover_scripts: Vec::new(),
    };

    let manifest = run_campaign(&ctx, &spec).await.unwrap();

    assert_eq!(manifest.summary.total, 3);
    assert_eq!(manifest.summary.successful, 2);
    assert_eq!(manifest.summary.failed, 1);

    let failed = &manifest.creatives[1];
    assert_eq!(failed.index, 2);
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().contains("generation failure"));
    assert!(failed.creative.is_none());
    assert!(failed.voiceover.is_none());
    assert!(failed.export.is_none());
    assert!(failed.merged_video.is_none());

    // Siblings ran to completion independently
    for i in [0, 2] {
        let ok = &manifest.creatives[i];
        assert!(ok.success);
        assert!(ok.merged_video.is_some());
    }
}

#[tokio::test]
async fn export_failure_degrades_but_variation_stays_successful() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(
        dir.path(),
        Some(StubVoice { fail: false }),
        StubExporter { fail: true },
        StubMerger::succeeding(),
    );

    let manifest = run_campaign(&ctx, &scripted_spec(&["Only script"])).await.unwrap();

    let creative = &manifest.creatives[0];
    assert!(creative.success);
    assert_eq!(manifest.summary.successful, 1);
    assert!(creative.export_error.as_deref().unwrap().contains("export outage"));
    assert!(creative.local_video_path.is_none());
    assert!(creative.video_url.is_none());
    // No local video, so the merge stage never ran
    assert!(creative.merged_video.is_none());
    assert!(creative.merge_error.is_none());
}

#[tokio::test]
async fn missing_voice_credential_skips_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(
        dir.path(),
        None,
        StubExporter { fail: false },
        StubMerger::succeeding(),
    );

    let manifest = run_campaign(&ctx, &scripted_spec(&["Wanted a voice"])).await.unwrap();

    let creative = &manifest.creatives[0];
    assert!(creative.success);
    assert!(creative.voiceover.is_none());
    assert!(creative.voiceover_error.is_none());
    // Skip-with-notice never writes error files
    assert!(errors_in(&manifest.directory).is_empty());
    // No voiceover, so the silent export is the final word
    assert!(creative.merged_video.is_none());
    assert!(creative.video_url.is_some());
}

#[tokio::test]
async fn voiceover_failure_writes_error_file_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(
        dir.path(),
        Some(StubVoice { fail: true }),
        StubExporter { fail: false },
        StubMerger::succeeding(),
    );

    let manifest = run_campaign(&ctx, &scripted_spec(&["Doomed script"])).await.unwrap();

    let creative = &manifest.creatives[0];
    assert!(creative.success);
    assert!(creative
        .voiceover_error
        .as_deref()
        .unwrap()
        .contains("Voiceover generation failed"));
    assert!(creative.export.is_some());
    assert!(creative.merged_video.is_none());

    assert_eq!(errors_in(&manifest.directory), vec!["variant_1.txt".to_string()]);
    let content =
        std::fs::read_to_string(manifest.directory.join("errors/variant_1.txt")).unwrap();
    assert!(content.contains("Voiceover generation failed"));
}

#[tokio::test]
async fn merge_skipped_when_tool_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(
        dir.path(),
        Some(StubVoice { fail: false }),
        StubExporter { fail: false },
        StubMerger {
            behavior: MergeBehavior::Unavailable,
            verify_ok: true,
        },
    );

    let manifest = run_campaign(&ctx, &scripted_spec(&["Script"])).await.unwrap();

    let creative = &manifest.creatives[0];
    assert!(creative.success);
    assert!(creative.merged_video.is_none());
    assert!(creative.merge_error.is_none());
    // Un-merged export stays valid, CDN URL included
    assert!(creative.video_url.is_some());
    assert!(creative
        .local_video_path
        .as_ref()
        .unwrap()
        .ends_with("videos/design-base_1.mp4"));
    assert!(errors_in(&manifest.directory).is_empty());
}

#[tokio::test]
async fn merge_failure_keeps_silent_video_and_records_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(
        dir.path(),
        Some(StubVoice { fail: false }),
        StubExporter { fail: false },
        StubMerger {
            behavior: MergeBehavior::Fail,
            verify_ok: true,
        },
    );

    let manifest = run_campaign(&ctx, &scripted_spec(&["Script"])).await.unwrap();

    let creative = &manifest.creatives[0];
    assert!(creative.success);
    assert!(creative.merge_error.as_deref().unwrap().starts_with("Merge error:"));
    assert!(creative.merged_video.is_none());
    assert!(!creative.has_audio_stream);
    // The silent export remains the primary reference
    assert!(creative.video_url.is_some());
    assert!(creative
        .local_video_path
        .as_ref()
        .unwrap()
        .ends_with("videos/design-base_1.mp4"));
    assert_eq!(errors_in(&manifest.directory), vec!["variant_1.txt".to_string()]);
}

#[tokio::test]
async fn audio_verification_failure_never_claims_audio() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(
        dir.path(),
        Some(StubVoice { fail: false }),
        StubExporter { fail: false },
        StubMerger {
            behavior: MergeBehavior::Succeed,
            verify_ok: false,
        },
    );

    let manifest = run_campaign(&ctx, &scripted_spec(&["Script"])).await.unwrap();

    let creative = &manifest.creatives[0];
    assert!(creative.success);
    // Merge itself succeeded and superseded the CDN URL
    assert!(creative.merged_video.is_some());
    assert!(creative.video_url.is_none());
    // But audio presence is never assumed
    assert!(!creative.has_audio_stream);
    assert!(creative
        .audio_verification_error
        .as_deref()
        .unwrap()
        .contains("probe failure"));
}
