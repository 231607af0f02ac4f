//! Capability trait definitions for berth.
//!
//! These traits define the two external collaborators of the core:
//! - `HostingProvider`: project provisioning, file upload, site listing
//! - `CompletionModel`: text-in/text-out generation for repair proposals
//!
//! Both traits are async and backend-agnostic. The orchestrator receives
//! them as injected dependencies — there are no process-wide singletons,
//! so independent orchestrations can run concurrently against shared,
//! stateless implementations. In-memory fakes are provided for testing
//! via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{DeployConfig, FileSet, Result};

/// Handle to a provisioned (or reused) hosting project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHandle {
    pub id: String,
    pub name: String,
}

/// Provider-reported outcome of a single deploy call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub success: bool,
    pub logs: Option<String>,
    pub error_message: Option<String>,
}

impl DeployOutcome {
    pub fn succeeded(logs: impl Into<String>) -> Self {
        Self {
            success: true,
            logs: Some(logs.into()),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            logs: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// A site known to the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// Hosting provider capability.
///
/// This is the only surface through which the core touches real
/// infrastructure. Any concrete provider must implement exactly these
/// three operations.
#[async_trait]
pub trait HostingProvider: Send + Sync {
    /// Provision a project under `name`, or reuse one that already exists.
    async fn create_project(&self, name: &str, config: &DeployConfig) -> Result<ProjectHandle>;

    /// Upload `files` to the project and run the build.
    ///
    /// Infrastructure-level failures (network, auth) are errors; a deploy
    /// that ran but did not produce a live site is a `DeployOutcome` with
    /// `success == false`.
    async fn deploy(
        &self,
        project_id: &str,
        config: &DeployConfig,
        files: &FileSet,
    ) -> Result<DeployOutcome>;

    /// List the caller's existing sites.
    async fn list_projects(&self) -> Result<Vec<SiteInfo>>;
}

/// Text completion capability used by the repair oracle.
///
/// The core assumes nothing beyond "text in, text out, sometimes
/// unavailable" — prompt framing and response parsing live in
/// [`crate::repair`].
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Whether the underlying capability is configured and reachable.
    fn is_available(&self) -> bool;
}
