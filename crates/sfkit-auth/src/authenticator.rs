//! The OAuth-path orchestrator: cached session → silent refresh →
//! interactive grant.

use std::time::Duration;

use sfkit_config::SfConfig;

use crate::cache::SessionCache;
use crate::error::AuthError;
use crate::listener::CallbackListener;
use crate::oauth::{OAuthClient, TokenResponse};
use crate::session::{AuthOutcome, Session};
use crate::transport::Transport;

type BrowserOpener = Box<dyn Fn(&str) + Send + Sync>;

/// Decides between cache hit, silent refresh, and interactive grant, and
/// normalizes whatever succeeds into the one session shape.
pub struct SessionAuthenticator<T: Transport> {
    oauth: OAuthClient<T>,
    cache: SessionCache,
    listener: CallbackListener,
    opener: BrowserOpener,
}

impl<T: Transport> SessionAuthenticator<T> {
    #[must_use]
    pub fn from_config(transport: T, config: &SfConfig) -> Self {
        Self {
            oauth: OAuthClient::from_config(transport, config),
            cache: SessionCache::for_config(config),
            listener: CallbackListener::new(&config.oauth.redirect_uri),
            opener: Box::new(|url| {
                if let Err(error) = open::that(url) {
                    tracing::warn!(%error, %url, "failed to open browser; open the URL manually");
                }
            }),
        }
    }

    /// Replace the browser launcher. Tests use this to keep the interactive
    /// branch from opening a real browser.
    #[must_use]
    pub fn with_opener(mut self, opener: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    #[must_use]
    pub const fn oauth(&self) -> &OAuthClient<T> {
        &self.oauth
    }

    #[must_use]
    pub const fn listener(&self) -> &CallbackListener {
        &self.listener
    }

    /// Obtain a valid session, or start the interactive grant.
    ///
    /// `session_expired` forces a renewal even when the cached record is
    /// still within the interval (the caller saw the org reject it).
    ///
    /// # Errors
    ///
    /// Session-store and listener failures. Refresh denials are absorbed
    /// into the interactive fallback, never surfaced as `Err`.
    pub async fn login(
        &self,
        config: &SfConfig,
        session_expired: bool,
        timeout: Duration,
    ) -> Result<AuthOutcome, AuthError> {
        // Two passes at most: a failed refresh strips the stored token and
        // the second pass falls through to the interactive branch.
        for _ in 0..2 {
            let cached = self.cache.get(config);

            if !session_expired {
                if let Some(session) = &cached {
                    if session.is_fresh(config.session.force_login_interval) {
                        tracing::debug!("cached session still fresh");
                        return Ok(AuthOutcome::Valid(session.clone()));
                    }
                }
            }

            let Some(refresh_token) = cached.as_ref().and_then(|s| s.refresh_token.clone())
            else {
                break;
            };

            match self.oauth.refresh_token(&refresh_token, timeout).await {
                Ok(token) if token.is_granted() => {
                    match self.normalize(token, Some(refresh_token), config) {
                        Ok(session) => {
                            self.cache.put(&session, config)?;
                            tracing::debug!("session renewed from refresh token");
                            return Ok(AuthOutcome::Valid(session));
                        }
                        Err(error) => {
                            tracing::warn!(%error, "unusable refresh response, falling back to interactive grant");
                            self.strip_refresh_token(cached, config)?;
                        }
                    }
                }
                Ok(token) => {
                    if config.session.debug {
                        tracing::debug!(?token, "refresh token response");
                    }
                    tracing::debug!(
                        error = token.error.as_deref().unwrap_or("unknown"),
                        "refresh token rejected, falling back to interactive grant"
                    );
                    self.strip_refresh_token(cached, config)?;
                }
                Err(error) => {
                    tracing::warn!(%error, "token refresh failed, falling back to interactive grant");
                    self.strip_refresh_token(cached, config)?;
                }
            }
        }

        self.begin_interactive(config, session_expired)
    }

    /// Finish an interactive grant: normalize the code-exchange response and
    /// persist it. Invoked by whatever drains the callback listener, after
    /// [`OAuthClient::exchange_code`].
    ///
    /// # Errors
    ///
    /// `MalformedResponse` when the payload lacks the token/identity fields,
    /// or a session-store failure.
    pub fn complete_interactive(
        &self,
        token: TokenResponse,
        config: &SfConfig,
    ) -> Result<Session, AuthError> {
        let session = self.normalize(token, None, config)?;
        self.cache.put(&session, config)?;
        self.listener.stop();
        tracing::debug!("interactive grant completed");
        Ok(session)
    }

    /// Build the normalized session from a token-endpoint response.
    ///
    /// `carried_refresh_token` is the token that produced the response on
    /// the refresh path; the response's own `refresh_token` wins on the
    /// code-exchange path (where there is nothing to carry forward).
    fn normalize(
        &self,
        token: TokenResponse,
        carried_refresh_token: Option<String>,
        config: &SfConfig,
    ) -> Result<Session, AuthError> {
        let access_token = token
            .access_token
            .as_deref()
            .ok_or_else(|| AuthError::MalformedResponse("token response missing access_token".into()))?;
        let instance_url = token
            .instance_url
            .as_deref()
            .ok_or_else(|| AuthError::MalformedResponse("token response missing instance_url".into()))?;
        let user_id = token
            .user_id()
            .ok_or_else(|| AuthError::MalformedResponse("token response missing id".into()))?;

        let mut session = Session::authenticated(
            &config.project.default_project,
            access_token,
            instance_url,
            &user_id,
            &config.connection.api_version,
            true,
        );
        session.refresh_token = carried_refresh_token.or_else(|| token.refresh_token.clone());
        Ok(session)
    }

    /// Persist the stale session without its refresh token so the next pass
    /// (and the next call) goes straight to the interactive grant.
    fn strip_refresh_token(
        &self,
        cached: Option<Session>,
        config: &SfConfig,
    ) -> Result<(), AuthError> {
        if let Some(mut session) = cached {
            session.refresh_token = None;
            self.cache.put(&session, config)?;
        }
        Ok(())
    }

    fn begin_interactive(
        &self,
        config: &SfConfig,
        session_expired: bool,
    ) -> Result<AuthOutcome, AuthError> {
        let authorize_url = self.oauth.authorize_url(&config.credentials.username);
        self.listener.ensure_started()?;
        (self.opener)(&authorize_url);
        tracing::debug!(url = %authorize_url, "interactive OAuth2 grant started");

        let mut message = String::from("Waiting for OAuth2 login to finish");
        if session_expired {
            message = format!("Session invalid or expired, {message}");
        }
        Ok(AuthOutcome::PendingInteractive(message))
    }
}
