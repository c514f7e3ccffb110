//! Connected-app configuration for the OAuth2 authorization-code path.

use serde::{Deserialize, Serialize};

/// Default local redirect target for the authorization-code callback.
fn default_redirect_uri() -> String {
    "http://localhost:3333/callback".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthConfig {
    /// Connected-app consumer key.
    #[serde(default)]
    pub client_id: String,

    /// Connected-app consumer secret.
    #[serde(default)]
    pub client_secret: String,

    /// Redirect URI registered on the connected app. Must point at the
    /// local callback listener.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

impl OAuthConfig {
    /// Check if the OAuth config has the minimum required fields.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = OAuthConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.redirect_uri, "http://localhost:3333/callback");
    }

    #[test]
    fn configured_when_keys_set() {
        let config = OAuthConfig {
            client_id: "3MVG9...".into(),
            client_secret: "0123456789".into(),
            ..Default::default()
        };
        assert!(config.is_configured());
    }
}
