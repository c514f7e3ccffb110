//! Project identity and workspace location.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default project name when none is configured.
fn default_project() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Name of the project the session belongs to. One session record is
    /// kept per project.
    #[serde(default = "default_project")]
    pub default_project: String,

    /// Workspace directory the session cache lives under. Empty means the
    /// current directory.
    #[serde(default)]
    pub workspace: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            default_project: default_project(),
            workspace: String::new(),
        }
    }
}

impl ProjectConfig {
    /// Resolved workspace directory.
    pub fn workspace_dir(&self) -> PathBuf {
        if self.workspace.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.workspace)
        }
    }
}
