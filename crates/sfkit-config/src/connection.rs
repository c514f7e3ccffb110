//! Endpoint and API-version configuration.

use serde::{Deserialize, Serialize};

/// Default OAuth2 login host.
fn default_login_url() -> String {
    "https://login.salesforce.com".to_string()
}

/// Default API version (rendered as `v57.0`, `Soap/u/57.0`, ...).
fn default_api_version() -> String {
    "57".to_string()
}

/// Default per-request timeout in seconds.
const fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Login host for OAuth2 authorize/token endpoints. Use
    /// `https://test.salesforce.com` for sandboxes.
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Full SOAP login endpoint. When empty, derived from `login_url`
    /// and `api_version`.
    #[serde(default)]
    pub soap_login_url: String,

    /// API version without the `.0` suffix (e.g. `"57"`).
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Timeout for each individual network call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            soap_login_url: String::new(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ConnectionConfig {
    /// The SOAP login endpoint, deriving the partner-API URL from
    /// `login_url` when no explicit endpoint is configured.
    pub fn soap_login_url(&self) -> String {
        if self.soap_login_url.is_empty() {
            format!(
                "{}/services/Soap/u/{}.0",
                self.login_url.trim_end_matches('/'),
                self.api_version
            )
        } else {
            self.soap_login_url.clone()
        }
    }

    /// Per-request timeout as a `Duration`.
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
