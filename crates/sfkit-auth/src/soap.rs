//! Credential login against the partner SOAP endpoint.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use sfkit_config::SfConfig;

use crate::cache::SessionCache;
use crate::error::AuthError;
use crate::session::{AuthOutcome, Session};
use crate::transport::Transport;
use crate::xml;

/// Surfaced when the transient-failure budget is exhausted.
const NETWORK_TIMEOUT_MESSAGE: &str = "Network connection timeout";

fn login_envelope(username: &str, password: &str, security_token: &str) -> String {
    // Password is escaped so markup characters cannot break the envelope;
    // the security token is appended to the escaped password verbatim.
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
    <env:Body>
        <n1:login xmlns:n1="urn:partner.soap.sforce.com">
            <n1:username>{username}</n1:username>
            <n1:password>{password}{security_token}</n1:password>
        </n1:login>
    </env:Body>
</env:Envelope>"#,
        password = xml::escape(password),
    )
}

/// Performs the credential-based login exchange, with bounded immediate
/// retry on transport failure.
///
/// One instance per configuration: the consecutive-failure counter lives
/// here, carries across `login` calls, and only resets on a successful
/// round trip (or after the terminal failure, so the next independent call
/// starts with a full budget).
pub struct SoapAuthenticator<T: Transport> {
    transport: T,
    cache: SessionCache,
    retry_budget: u32,
    failures: Mutex<u32>,
}

impl<T: Transport> SoapAuthenticator<T> {
    #[must_use]
    pub fn new(transport: T, cache: SessionCache, retry_budget: u32) -> Self {
        Self {
            transport,
            cache,
            retry_budget,
            failures: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn from_config(transport: T, config: &SfConfig) -> Self {
        Self::new(
            transport,
            SessionCache::for_config(config),
            config.session.retry_budget,
        )
    }

    /// Obtain a valid session, reusing the cached one when still fresh.
    ///
    /// `force_fresh` skips the cache check and always performs the exchange.
    ///
    /// # Errors
    ///
    /// Only session-store failures surface as `Err`; protocol rejections and
    /// an exhausted retry budget come back as [`AuthOutcome::Failed`].
    pub async fn login(
        &self,
        config: &SfConfig,
        force_fresh: bool,
        timeout: Duration,
    ) -> Result<AuthOutcome, AuthError> {
        if !force_fresh {
            if let Some(session) = self.cache.get(config) {
                if session.is_fresh(config.session.force_login_interval) {
                    tracing::debug!("cached session still fresh, skipping SOAP login");
                    return Ok(AuthOutcome::Valid(session));
                }
            }
        }

        let url = config.connection.soap_login_url();
        let body = login_envelope(
            &config.credentials.username,
            &config.credentials.password,
            &config.credentials.security_token,
        );
        let headers = [
            ("content-type", "text/xml"),
            ("charset", "UTF-8"),
            ("SOAPAction", "login"),
        ];

        let response = loop {
            match self.transport.post(&url, &body, &headers, timeout).await {
                Ok(response) => {
                    *self.failures.lock().unwrap_or_else(PoisonError::into_inner) = 0;
                    break response;
                }
                Err(error) if error.is_transient() => {
                    let mut failures =
                        self.failures.lock().unwrap_or_else(PoisonError::into_inner);
                    *failures += 1;
                    tracing::debug!(failures = *failures, %error, "transient SOAP login failure");
                    if *failures >= self.retry_budget {
                        *failures = 0;
                        return Ok(AuthOutcome::Failed(NETWORK_TIMEOUT_MESSAGE.to_string()));
                    }
                    // Immediate retry, no backoff; each attempt already
                    // blocked for up to `timeout`.
                }
                Err(error) => return Err(AuthError::Transport(error)),
            }
        };

        if response.status != 200 {
            if config.session.debug {
                tracing::debug!(body = %response.body, "SOAP login error response");
            }
            let message = xml::element_value(&response.body, "sf:exceptionMessage")
                .unwrap_or_else(|| format!("SOAP login failed with status {}", response.status));
            tracing::debug!(status = response.status, %message, "SOAP login rejected");
            return Ok(AuthOutcome::Failed(message));
        }

        let Some(session_id) = xml::element_value(&response.body, "sessionId") else {
            return Ok(AuthOutcome::Failed("login response missing sessionId".into()));
        };
        let Some(server_url) = xml::element_value(&response.body, "serverUrl") else {
            return Ok(AuthOutcome::Failed("login response missing serverUrl".into()));
        };
        let user_id = xml::element_value(&response.body, "userId").unwrap_or_default();

        // Instance URL is the serverUrl prefix before its /services path.
        let instance_url = server_url
            .find("/services")
            .map_or(server_url.as_str(), |i| &server_url[..i]);

        let session = Session::authenticated(
            &config.project.default_project,
            &session_id,
            instance_url,
            &user_id,
            &config.connection.api_version,
            response.status < 399,
        );
        self.cache.put(&session, config)?;
        Ok(AuthOutcome::Valid(session))
    }
}
