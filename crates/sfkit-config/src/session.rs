//! Session renewal and retry tuning.

use serde::{Deserialize, Serialize};

/// Default renewal interval: force a fresh login every two hours.
const fn default_force_login_interval() -> i64 {
    120
}

/// Default budget of consecutive transient transport failures before a
/// SOAP login becomes a terminal failure. The upstream tool hardwired 12;
/// exposed here as a tunable.
const fn default_retry_budget() -> u32 {
    12
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Minutes after which a cached session is no longer considered fresh.
    #[serde(default = "default_force_login_interval")]
    pub force_login_interval: i64,

    /// Consecutive transient-failure budget for the SOAP login retry loop.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Emit protocol-level debug logging.
    #[serde(default)]
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            force_login_interval: default_force_login_interval(),
            retry_budget: default_retry_budget(),
            debug: false,
        }
    }
}
