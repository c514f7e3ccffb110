//! # sfkit-auth
//!
//! Session authentication against a Salesforce org over two mechanisms:
//! the partner-SOAP credential login and the OAuth2 authorization-code flow
//! with refresh-token renewal. Both produce one normalized [`Session`]
//! record, cached on disk so callers don't re-authenticate every request.
//!
//! Entry points: [`SoapAuthenticator`] for the credential path,
//! [`SessionAuthenticator`] for the OAuth path (`tiny_http` + `open` drive
//! the interactive grant).

pub mod authenticator;
pub mod cache;
pub mod error;
pub mod listener;
pub mod oauth;
pub mod session;
pub mod soap;
pub mod transport;
mod xml;

pub use authenticator::SessionAuthenticator;
pub use cache::SessionCache;
pub use error::AuthError;
pub use listener::CallbackListener;
pub use oauth::{OAuthClient, TokenResponse};
pub use session::{AuthOutcome, Session};
pub use soap::SoapAuthenticator;
pub use transport::{HttpTransport, Transport};

use sfkit_config::SfConfig;

/// Peek at the cached session without touching the network.
///
/// Returns the record even when stale — use [`Session::is_fresh`] to judge
/// it against the configured renewal interval.
#[must_use]
pub fn cached_session(config: &SfConfig) -> Option<Session> {
    SessionCache::for_config(config).get(config)
}
