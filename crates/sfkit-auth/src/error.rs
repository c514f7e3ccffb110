use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("network transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("login rejected: {0}")]
    Protocol(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("session store error: {0}")]
    SessionStore(String),

    #[error("callback listener error: {0}")]
    Listener(String),
}
