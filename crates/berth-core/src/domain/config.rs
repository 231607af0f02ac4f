//! Deployment configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hosting providers limit site names to 63 characters.
const MAX_PROJECT_NAME_LEN: usize = 63;

/// Immutable input to a deployment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Human-entered project name; sanitized before use as a site name.
    pub project_name: String,

    /// Build command to run on the provider (e.g. `npm run build`).
    pub build_command: Option<String>,

    /// Directory published after the build (e.g. `dist`).
    pub publish_directory: Option<String>,

    /// Environment variables available to the build.
    pub environment: BTreeMap<String, String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            project_name: "site".to_string(),
            build_command: None,
            publish_directory: None,
            environment: BTreeMap::new(),
        }
    }
}

impl DeployConfig {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Default::default()
        }
    }

    /// Site-name-safe form of the project name.
    ///
    /// Lowercased, every run of non `[a-z0-9-]` characters collapsed to a
    /// single `-`, leading/trailing `-` trimmed, truncated to the
    /// provider's 63-character limit.
    pub fn sanitized_project_name(&self) -> String {
        let mut out = String::with_capacity(self.project_name.len());
        for c in self.project_name.to_lowercase().chars() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                out.push(c);
            } else {
                out.push('-');
            }
        }
        let mut collapsed = String::with_capacity(out.len());
        let mut prev_dash = false;
        for c in out.chars() {
            if c == '-' {
                if !prev_dash {
                    collapsed.push(c);
                }
                prev_dash = true;
            } else {
                collapsed.push(c);
                prev_dash = false;
            }
        }
        let trimmed = collapsed.trim_matches('-');
        trimmed.chars().take(MAX_PROJECT_NAME_LEN).collect()
    }
}
