//! Local listener used as the OAuth2 redirect target.
//!
//! Lifecycle only: the listener answers every request with a static
//! close-this-tab page; reading the authorization code out of the redirect
//! and finishing the grant is the caller's job. At most one server is ever
//! bound per instance, and `ensure_started`/`stop` are both idempotent.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crate::error::AuthError;

const CALLBACK_PAGE: &str =
    "<html><body><h1>Authenticated!</h1><p>You can close this tab.</p></body></html>";

struct ListenerHandle {
    server: Arc<tiny_http::Server>,
    thread: JoinHandle<()>,
}

pub struct CallbackListener {
    addr: String,
    handle: Mutex<Option<ListenerHandle>>,
}

impl CallbackListener {
    /// Listener bound (lazily) to the host and port of `redirect_uri`.
    #[must_use]
    pub fn new(redirect_uri: &str) -> Self {
        Self {
            addr: bind_addr(redirect_uri),
            handle: Mutex::new(None),
        }
    }

    /// Start the listener if it is not already running.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Listener` if the address cannot be bound.
    pub fn ensure_started(&self) -> Result<(), AuthError> {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return Ok(());
        }

        let server = tiny_http::Server::http(self.addr.as_str())
            .map_err(|e| AuthError::Listener(format!("failed to bind {}: {e}", self.addr)))?;
        let server = Arc::new(server);
        tracing::debug!(addr = %self.addr, "callback listener started");

        let accept = Arc::clone(&server);
        let thread = std::thread::spawn(move || {
            // recv() returns Err once unblock() is called from stop().
            while let Ok(request) = accept.recv() {
                let response = tiny_http::Response::from_string(CALLBACK_PAGE).with_header(
                    tiny_http::Header::from_bytes("Content-Type", "text/html").unwrap(),
                );
                let _ = request.respond(response);
            }
        });

        *guard = Some(ListenerHandle { server, thread });
        Ok(())
    }

    /// Stop the listener and release the port. No-op when not running.
    pub fn stop(&self) {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = guard.take() {
            handle.server.unblock();
            let _ = handle.thread.join();
            tracing::debug!(addr = %self.addr, "callback listener stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `host:port` portion of a redirect URI, defaulting the port to 80.
fn bind_addr(redirect_uri: &str) -> String {
    let after_scheme = redirect_uri
        .split_once("://")
        .map_or(redirect_uri, |(_, rest)| rest);
    let authority = after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(after_scheme);
    if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{authority}:80")
    }
}
