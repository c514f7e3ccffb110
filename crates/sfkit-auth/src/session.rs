//! The normalized session record.
//!
//! Both login protocols (SOAP credential login and the OAuth2 flows) produce
//! this one shape. The serialized form is the storage contract the rest of a
//! larger toolchain reads, so field names stay as the original wrote them.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Second-resolution local timestamp format used in the persisted record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Authenticated-access record usable to call the target org.
///
/// Invariant: every field is populated except when `success` is `false`,
/// in which case only `success` and `error_message` are guaranteed. The
/// record is always overwritten wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub project_name: String,
    /// Access token / SOAP session id.
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub metadata_url: String,
    #[serde(default)]
    pub rest_url: String,
    #[serde(default)]
    pub apex_url: String,
    #[serde(default)]
    pub partner_url: String,
    #[serde(default)]
    pub instance_url: String,
    #[serde(default)]
    pub user_id: String,
    /// Creation time, `%Y-%m-%d %H:%M:%S` local.
    #[serde(default)]
    pub time_stamp: String,
    /// Ready-to-use request headers (`Authorization`, content negotiation).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Session {
    /// Build a fully-populated session from a successful exchange.
    ///
    /// The four endpoint URLs are derived by substituting `instance_url` and
    /// `api_version` into fixed path templates.
    #[must_use]
    pub fn authenticated(
        project_name: &str,
        session_id: &str,
        instance_url: &str,
        user_id: &str,
        api_version: &str,
        success: bool,
    ) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), format!("OAuth {session_id}"));
        headers.insert(
            "Content-Type".to_string(),
            "application/json; charset=UTF-8".to_string(),
        );
        headers.insert("Accept".to_string(), "application/json".to_string());

        Self {
            project_name: project_name.to_string(),
            session_id: session_id.to_string(),
            metadata_url: format!("{instance_url}/services/Soap/m/{api_version}.0"),
            rest_url: format!("{instance_url}/services/data/v{api_version}.0"),
            apex_url: format!("{instance_url}/services/Soap/s/{api_version}.0"),
            partner_url: format!("{instance_url}/services/Soap/u/{api_version}.0"),
            instance_url: instance_url.to_string(),
            user_id: user_id.to_string(),
            time_stamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            headers,
            success,
            refresh_token: None,
            error_message: None,
        }
    }

    /// Build a terminal-failure record.
    #[must_use]
    pub fn failed(message: &str) -> Self {
        Self {
            success: false,
            error_message: Some(message.to_string()),
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            project_name: String::new(),
            session_id: String::new(),
            metadata_url: String::new(),
            rest_url: String::new(),
            apex_url: String::new(),
            partner_url: String::new(),
            instance_url: String::new(),
            user_id: String::new(),
            time_stamp: String::new(),
            headers: BTreeMap::new(),
            success: false,
            refresh_token: None,
            error_message: None,
        }
    }

    /// Whether the record is still within the renewal interval.
    ///
    /// A missing or unparseable `time_stamp` is never fresh — the caller
    /// falls back to re-authentication instead of erroring.
    #[must_use]
    pub fn is_fresh(&self, interval_minutes: i64) -> bool {
        let Ok(stamp) = NaiveDateTime::parse_from_str(&self.time_stamp, TIMESTAMP_FORMAT) else {
            return false;
        };
        stamp + TimeDelta::minutes(interval_minutes) >= Local::now().naive_local()
    }
}

/// Result of an authentication request.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Cache hit or fresh login.
    Valid(Session),
    /// Terminal failure (exhausted retry budget, rejected credentials).
    Failed(String),
    /// An interactive authorization flow was launched; completion arrives
    /// via the callback listener, outside this call.
    PendingInteractive(String),
}

impl AuthOutcome {
    /// The session, when the outcome is [`AuthOutcome::Valid`].
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Valid(session) => Some(session),
            _ => None,
        }
    }
}

/// Last 18 characters of an OAuth identity URL — the org-qualified user id.
/// Identity values shorter than 18 characters are returned whole.
#[must_use]
pub fn user_id_from_identity(id: &str) -> String {
    let start = id.char_indices().rev().nth(17).map_or(0, |(i, _)| i);
    id[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stamp(delta_minutes: i64) -> String {
        (Local::now().naive_local() + TimeDelta::minutes(delta_minutes))
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    #[test]
    fn endpoint_urls_substitute_instance_and_version() {
        let session = Session::authenticated(
            "demo",
            "ABC",
            "https://na1.salesforce.com",
            "005000000000000000",
            "55",
            true,
        );
        assert_eq!(
            session.rest_url,
            "https://na1.salesforce.com/services/data/v55.0"
        );
        assert_eq!(
            session.metadata_url,
            "https://na1.salesforce.com/services/Soap/m/55.0"
        );
        assert_eq!(
            session.apex_url,
            "https://na1.salesforce.com/services/Soap/s/55.0"
        );
        assert_eq!(
            session.partner_url,
            "https://na1.salesforce.com/services/Soap/u/55.0"
        );
        assert_eq!(
            session.headers.get("Authorization").map(String::as_str),
            Some("OAuth ABC")
        );
    }

    #[test]
    fn fresh_within_interval() {
        let mut session = Session::authenticated("p", "s", "https://i", "u", "55", true);
        session.time_stamp = stamp(-(120 - 1));
        assert!(session.is_fresh(120));
    }

    #[test]
    fn stale_past_interval() {
        let mut session = Session::authenticated("p", "s", "https://i", "u", "55", true);
        session.time_stamp = stamp(-(120 + 1));
        assert!(!session.is_fresh(120));
    }

    #[test]
    fn malformed_timestamp_is_never_fresh() {
        let mut session = Session::authenticated("p", "s", "https://i", "u", "55", true);
        session.time_stamp = "not-a-date".into();
        assert!(!session.is_fresh(120));
        session.time_stamp = String::new();
        assert!(!session.is_fresh(120));
    }

    #[test]
    fn failed_record_only_guarantees_error_fields() {
        let session = Session::failed("Network connection timeout");
        assert!(!session.success);
        assert_eq!(
            session.error_message.as_deref(),
            Some("Network connection timeout")
        );
        assert!(session.session_id.is_empty());
    }

    #[test]
    fn user_id_is_last_18_chars_of_identity() {
        let id = "https://login.salesforce.com/id/00Dxx0000001gEREAY/005xx000001Sv6AAAS";
        assert_eq!(user_id_from_identity(id), "005xx000001Sv6AAAS");

        let thirty = "abcdefghijkl005xx000001Sv6AAAS";
        assert_eq!(thirty.len(), 30);
        assert_eq!(user_id_from_identity(thirty), "005xx000001Sv6AAAS");
    }

    #[test]
    fn short_identity_returned_whole() {
        assert_eq!(user_id_from_identity("005short"), "005short");
    }

    #[test]
    fn serde_round_trip_preserves_field_names() {
        let session = Session::authenticated("demo", "tok", "https://i", "u", "55", true);
        let json = serde_json::to_string(&session).expect("serialize");
        assert!(json.contains("\"session_id\""));
        assert!(json.contains("\"time_stamp\""));
        // Absent options are omitted from the stored record.
        assert!(!json.contains("refresh_token"));
        let back: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, session);
    }
}
