//! Shared response handling for the provider clients.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Error body shape shared by the remote APIs.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
    pub error: Option<NestedError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NestedError {
    pub message: Option<String>,
}

/// Decode a JSON response, mapping non-2xx statuses to `ProviderError::Api`
/// with the best available message.
pub(crate) async fn expect_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> ProviderResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::api(status.as_u16(), extract_message(&body, status.as_u16())))
}

/// Pull a human-readable message out of an error body.
fn extract_message(body: &str, status: u16) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = parsed.message {
            return message;
        }
        if let Some(message) = parsed.error.and_then(|e| e.message) {
            return message;
        }
    }
    format!("HTTP {status}")
}
