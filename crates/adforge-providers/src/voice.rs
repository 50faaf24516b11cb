//! Voiceover synthesis client.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use adforge_models::VoiceoverArtifact;

use crate::credentials::VoiceApiKey;
use crate::error::{ProviderError, ProviderResult};

/// Default voiceover API endpoint.
pub const DEFAULT_VOICE_API_BASE: &str = "https://api.elevenlabs.io";

/// Default voice: clear, professional female.
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Where and under what name to write the synthesized audio.
#[derive(Debug, Clone)]
pub struct VoiceRequest {
    pub voice_id: String,
    pub output_dir: PathBuf,
    pub file_prefix: String,
}

/// Capability contract: synthesize narration audio from text.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        request: &VoiceRequest,
    ) -> ProviderResult<VoiceoverArtifact>;
}

/// Text-to-speech API client.
pub struct VoiceApiClient {
    http: Client,
    api_key: VoiceApiKey,
    base_url: String,
    model_id: String,
    settings: VoiceSettings,
}

/// Synthesis tuning parameters.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

impl VoiceApiClient {
    pub fn new(api_key: VoiceApiKey) -> Self {
        Self {
            http: Client::new(),
            api_key,
            base_url: DEFAULT_VOICE_API_BASE.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            settings: VoiceSettings::default(),
        }
    }

    /// Override the API base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_settings(mut self, settings: VoiceSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[async_trait]
impl VoiceSynthesizer for VoiceApiClient {
    async fn synthesize(
        &self,
        text: &str,
        request: &VoiceRequest,
    ) -> ProviderResult<VoiceoverArtifact> {
        info!(
            "Synthesizing voiceover ({} chars) with voice {}",
            text.len(),
            request.voice_id
        );

        let body = TtsRequest {
            text,
            model_id: &self.model_id,
            voice_settings: &self.settings,
        };

        let response = self
            .http
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.base_url, request.voice_id
            ))
            .header("xi-api-key", self.api_key.as_str())
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::api(
                status.as_u16(),
                if message.is_empty() {
                    format!("HTTP {status}")
                } else {
                    message
                },
            ));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(ProviderError::synthesis_failed("empty audio response"));
        }

        tokio::fs::create_dir_all(&request.output_dir).await?;
        let file_path = request.output_dir.join(format!(
            "{}_{}.mp3",
            request.file_prefix,
            Utc::now().timestamp_millis()
        ));
        tokio::fs::write(&file_path, &audio).await?;

        let (word_count, estimated_duration_secs) = VoiceoverArtifact::estimate_duration(text);
        info!(
            "Voiceover saved: {} ({} words, ~{:.1}s)",
            file_path.display(),
            word_count,
            estimated_duration_secs
        );

        Ok(VoiceoverArtifact {
            file_path,
            script: text.to_string(),
            word_count,
            estimated_duration_secs,
            voice_id: request.voice_id.clone(),
        })
    }
}
