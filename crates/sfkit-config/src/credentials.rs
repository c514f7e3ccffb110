//! Salesforce credential configuration for the SOAP login path.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// Salesforce username (also used as the OAuth `login_hint`).
    #[serde(default)]
    pub username: String,

    /// Salesforce password.
    #[serde(default)]
    pub password: String,

    /// Security token appended to the password in the SOAP login body.
    /// Empty when the org trusts the caller's IP range.
    #[serde(default)]
    pub security_token: String,
}

impl CredentialsConfig {
    /// Check if the credential config has the minimum required fields.
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}
