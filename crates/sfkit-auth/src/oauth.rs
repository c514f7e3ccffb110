//! OAuth2 exchanges against the login host's token endpoint.
//!
//! Only the authorization-code grant (and its refresh-token renewal) is
//! supported.

use std::time::Duration;

use serde::Deserialize;
use sfkit_config::SfConfig;

use crate::error::AuthError;
use crate::session::user_id_from_identity;
use crate::transport::Transport;

/// Token endpoint payload: either an access token with its identity URL, or
/// an error payload with no access token. The endpoint returns JSON for both,
/// so the body is parsed regardless of the HTTP status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub instance_url: Option<String>,
    /// Identity URL; its last 18 characters are the user id.
    pub id: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// Whether the exchange produced a usable access token.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        self.access_token.is_some()
    }

    /// User id derived from the identity URL's 18-character suffix.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.id.as_deref().map(user_id_from_identity)
    }
}

pub struct OAuthClient<T: Transport> {
    transport: T,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    login_url: String,
}

impl<T: Transport> OAuthClient<T> {
    #[must_use]
    pub fn new(
        transport: T,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        login_url: &str,
    ) -> Self {
        Self {
            transport,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            login_url: login_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn from_config(transport: T, config: &SfConfig) -> Self {
        Self::new(
            transport,
            &config.oauth.client_id,
            &config.oauth.client_secret,
            &config.oauth.redirect_uri,
            &config.connection.login_url,
        )
    }

    /// Authorization-code request URL for the interactive grant.
    #[must_use]
    pub fn authorize_url(&self, login_hint: &str) -> String {
        format!(
            "{}/services/oauth2/authorize?response_type=code&client_id={}&redirect_uri={}&login_hint={}",
            self.login_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(login_hint),
        )
    }

    /// Renew an access token from a stored refresh token.
    ///
    /// A denial (no `access_token` in the payload) is an `Ok` response —
    /// callers decide how to recover. Only transport and parse failures
    /// are `Err`.
    ///
    /// # Errors
    ///
    /// Transport failure, or a body that is not the endpoint's JSON shape.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        timeout: Duration,
    ) -> Result<TokenResponse, AuthError> {
        self.token_request(
            &[
                ("grant_type", "refresh_token"),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("refresh_token", refresh_token),
            ],
            timeout,
        )
        .await
    }

    /// Exchange the authorization code delivered to the redirect listener.
    ///
    /// # Errors
    ///
    /// Transport failure, or a body that is not the endpoint's JSON shape.
    pub async fn exchange_code(
        &self,
        code: &str,
        timeout: Duration,
    ) -> Result<TokenResponse, AuthError> {
        self.token_request(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_uri),
                ("code", code),
            ],
            timeout,
        )
        .await
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<TokenResponse, AuthError> {
        let url = format!("{}/services/oauth2/token", self.login_url);
        let body = form_encode(params);
        let response = self
            .transport
            .post(
                &url,
                &body,
                &[("Content-Type", "application/x-www-form-urlencoded")],
                timeout,
            )
            .await?;

        serde_json::from_str(&response.body).map_err(|e| {
            AuthError::MalformedResponse(format!("token endpoint returned invalid JSON: {e}"))
        })
    }
}

fn form_encode(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;
    use pretty_assertions::assert_eq;

    fn client(transport: &ScriptedTransport) -> OAuthClient<&ScriptedTransport> {
        OAuthClient::new(
            transport,
            "3MVG9client",
            "secret",
            "http://localhost:3333/callback",
            "https://login.salesforce.com",
        )
    }

    #[test]
    fn authorize_url_encodes_parameters() {
        let transport = ScriptedTransport::new(vec![]);
        let url = client(&transport).authorize_url("dev@example.com");
        assert_eq!(
            url,
            "https://login.salesforce.com/services/oauth2/authorize?response_type=code\
             &client_id=3MVG9client\
             &redirect_uri=http%3A%2F%2Flocalhost%3A3333%2Fcallback\
             &login_hint=dev%40example.com"
        );
    }

    #[tokio::test]
    async fn refresh_parses_grant() {
        let body = r#"{
            "access_token": "00D!AQE",
            "instance_url": "https://na1.salesforce.com",
            "id": "https://login.salesforce.com/id/00Dxx0000001gEREAY/005xx000001Sv6AAAS"
        }"#;
        let transport = ScriptedTransport::new(vec![ScriptedTransport::ok(200, body)]);
        let token = client(&transport)
            .refresh_token("the-refresh-token", Duration::from_secs(1))
            .await
            .expect("refresh");
        assert!(token.is_granted());
        assert_eq!(token.user_id().as_deref(), Some("005xx000001Sv6AAAS"));
        assert_eq!(token.instance_url.as_deref(), Some("https://na1.salesforce.com"));
    }

    #[tokio::test]
    async fn refresh_denial_is_ok_without_token() {
        let body = r#"{"error":"invalid_grant","error_description":"expired access/refresh token"}"#;
        let transport = ScriptedTransport::new(vec![ScriptedTransport::ok(400, body)]);
        let token = client(&transport)
            .refresh_token("stale", Duration::from_secs(1))
            .await
            .expect("denial still parses");
        assert!(!token.is_granted());
        assert_eq!(token.error.as_deref(), Some("invalid_grant"));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let transport = ScriptedTransport::new(vec![ScriptedTransport::ok(502, "<html>bad gateway</html>")]);
        let result = client(&transport)
            .refresh_token("rt", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(AuthError::MalformedResponse(_))));
    }

    #[test]
    fn form_encode_escapes_values() {
        let encoded = form_encode(&[("code", "a/b+c"), ("redirect_uri", "http://x/y")]);
        assert_eq!(encoded, "code=a%2Fb%2Bc&redirect_uri=http%3A%2F%2Fx%2Fy");
    }
}
