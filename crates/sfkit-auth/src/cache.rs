//! File-backed session cache: one record per project.
//!
//! Records live at `{workspace}/.sfkit/{project}/session.json`. Writes go
//! through a temp file and an atomic rename so a crash mid-write can never
//! leave a half-written record for the next `get` to see.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use sfkit_config::SfConfig;

use crate::error::AuthError;
use crate::session::Session;

const SESSION_FILE_NAME: &str = "session.json";

pub struct SessionCache {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Cache rooted at the configured workspace directory.
    #[must_use]
    pub fn for_config(config: &SfConfig) -> Self {
        Self::new(config.project.workspace_dir())
    }

    /// The last persisted session for this configuration's project.
    ///
    /// Missing or unparseable content is `None` — a corrupt cache falls
    /// back to re-authentication, it never errors.
    #[must_use]
    pub fn get(&self, config: &SfConfig) -> Option<Session> {
        let raw = fs::read_to_string(self.session_path(config)).ok()?;
        if raw.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(error) => {
                tracing::warn!(%error, "discarding unparseable session record");
                None
            }
        }
    }

    /// Persist `session`, overwriting any prior record wholesale.
    ///
    /// Durably recorded before this returns, or the error surfaces.
    pub fn put(&self, session: &Session, config: &SfConfig) -> Result<(), AuthError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let path = self.session_path(config);
        let parent = path
            .parent()
            .ok_or_else(|| AuthError::SessionStore("session path has no parent".into()))?;
        fs::create_dir_all(parent)
            .map_err(|e| AuthError::SessionStore(format!("mkdir {}: {e}", parent.display())))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
                tracing::warn!("failed to chmod 0700 {}: {e}", parent.display());
            }
        }

        let json = serde_json::to_string_pretty(session)
            .map_err(|e| AuthError::SessionStore(format!("serialize session: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| AuthError::SessionStore(format!("write {}: {e}", tmp.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
                .map_err(|e| AuthError::SessionStore(format!("chmod {}: {e}", tmp.display())))?;
        }

        fs::rename(&tmp, &path)
            .map_err(|e| AuthError::SessionStore(format!("rename to {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "session record persisted");
        Ok(())
    }

    fn session_path(&self, config: &SfConfig) -> PathBuf {
        self.root
            .join(".sfkit")
            .join(&config.project.default_project)
            .join(SESSION_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_for(project: &str) -> SfConfig {
        let mut config = SfConfig::default();
        config.project.default_project = project.to_string();
        config
    }

    #[test]
    fn put_then_get_round_trips() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let cache = SessionCache::new(tmp.path());
        let config = config_for("demo");

        let session = Session::authenticated("demo", "tok", "https://na1", "u", "55", true);
        cache.put(&session, &config).expect("put");
        assert_eq!(cache.get(&config), Some(session));
    }

    #[test]
    fn get_returns_none_without_record() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let cache = SessionCache::new(tmp.path());
        assert_eq!(cache.get(&config_for("demo")), None);
    }

    #[test]
    fn corrupt_record_is_treated_as_absent() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let cache = SessionCache::new(tmp.path());
        let config = config_for("demo");

        let dir = tmp.path().join(".sfkit").join("demo");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join(SESSION_FILE_NAME), "{not json").expect("write");
        assert_eq!(cache.get(&config), None);
    }

    #[test]
    fn put_overwrites_wholesale() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let cache = SessionCache::new(tmp.path());
        let config = config_for("demo");

        let mut first = Session::authenticated("demo", "tok1", "https://na1", "u", "55", true);
        first.refresh_token = Some("refresh".into());
        cache.put(&first, &config).expect("put first");

        let second = Session::authenticated("demo", "tok2", "https://na2", "u", "55", true);
        cache.put(&second, &config).expect("put second");

        let loaded = cache.get(&config).expect("record");
        assert_eq!(loaded.session_id, "tok2");
        // No merge: the first record's refresh token is gone.
        assert_eq!(loaded.refresh_token, None);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let cache = SessionCache::new(tmp.path());
        let config = config_for("demo");

        let session = Session::authenticated("demo", "tok", "https://na1", "u", "55", true);
        cache.put(&session, &config).expect("put");

        let dir = tmp.path().join(".sfkit").join("demo");
        let names: Vec<_> = fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![SESSION_FILE_NAME]);
    }

    #[test]
    fn projects_are_isolated() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let cache = SessionCache::new(tmp.path());

        let session = Session::authenticated("a", "tok", "https://na1", "u", "55", true);
        cache.put(&session, &config_for("a")).expect("put");
        assert!(cache.get(&config_for("a")).is_some());
        assert!(cache.get(&config_for("b")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn record_is_owner_readable_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let cache = SessionCache::new(tmp.path());
        let config = config_for("demo");
        let session = Session::authenticated("demo", "tok", "https://na1", "u", "55", true);
        cache.put(&session, &config).expect("put");

        let path = tmp.path().join(".sfkit").join("demo").join(SESSION_FILE_NAME);
        let mode = fs::metadata(path).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
