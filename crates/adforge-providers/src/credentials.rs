//! Credential newtypes for the external collaborators.
//!
//! Token refresh and the OAuth handshake live outside this crate; clients
//! receive a ready-to-use credential at construction.

/// Bearer token for the design-template API.
#[derive(Clone)]
pub struct DesignToken(String);

impl DesignToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DesignToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DesignToken(****)")
    }
}

/// API key for the voiceover service.
#[derive(Clone)]
pub struct VoiceApiKey(String);

impl VoiceApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for VoiceApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VoiceApiKey(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let token = DesignToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "DesignToken(****)");

        let key = VoiceApiKey::new("also-secret");
        assert_eq!(format!("{key:?}"), "VoiceApiKey(****)");
    }
}
