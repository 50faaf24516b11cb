//! Clients for the external collaborators the pipeline orchestrates:
//! creative generation, voiceover synthesis, and design export.
//!
//! Each collaborator is modeled as a capability trait plus a reqwest-backed
//! client; the pipeline depends only on the traits.

pub mod creative;
pub mod credentials;
pub mod error;
pub mod export;
mod http;
pub mod voice;

pub use creative::{CreativeGenerator, DesignApiClient, DEFAULT_DESIGN_API_BASE};
pub use credentials::{DesignToken, VoiceApiKey};
pub use error::{ProviderError, ProviderResult};
pub use export::{
    DesignExporter, ExportApiClient, ExportRequest, RetrievalMode, DEFAULT_VIDEO_QUALITY,
};
pub use voice::{
    VoiceApiClient, VoiceRequest, VoiceSettings, VoiceSynthesizer, DEFAULT_VOICE_API_BASE,
    DEFAULT_VOICE_ID,
};
