//! Structured observability hooks for the deployment lifecycle.
//!
//! This module provides:
//! - Deployment-scoped tracing spans via the `DeploySpan` RAII guard
//! - Emission functions for key lifecycle events: start, attempt,
//!   failure, repair request, success, exhaustion, cancellation
//!
//! Spans are per-orchestration-instance, so concurrent deployments keep
//! their log streams separate. Events are emitted at `info!` level.

use tracing::info;

use crate::classify::ErrorKind;

/// RAII guard that enters a deployment-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = DeploySpan::enter("f3b1…");
/// // tracing calls below here carry deployment_id = "f3b1…"
/// ```
pub struct DeploySpan {
    _span: tracing::span::EnteredSpan,
}

impl DeploySpan {
    /// Create and enter a span tagged with the deployment id.
    pub fn enter(deployment_id: &str) -> Self {
        let span = tracing::info_span!("berth.deploy", deployment_id = %deployment_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: orchestration started.
pub fn emit_deploy_started(deployment_id: &str, project_name: &str, file_count: usize) {
    info!(
        event = "deploy.started",
        deployment_id = %deployment_id,
        project_name = %project_name,
        file_count,
    );
}

/// Emit event: attempt N of M beginning.
pub fn emit_attempt_started(deployment_id: &str, attempt: u32, max_attempts: u32) {
    info!(
        event = "attempt.started",
        deployment_id = %deployment_id,
        attempt,
        max_attempts,
    );
}

/// Emit event: attempt failed with a classified error.
pub fn emit_attempt_failed(deployment_id: &str, attempt: u32, kind: ErrorKind, message: &str) {
    info!(
        event = "attempt.failed",
        deployment_id = %deployment_id,
        attempt,
        kind = ?kind,
        message = %message,
    );
}

/// Emit event: repair proposal requested from the model.
pub fn emit_repair_requested(deployment_id: &str, after_attempt: u32) {
    info!(
        event = "repair.requested",
        deployment_id = %deployment_id,
        after_attempt,
    );
}

/// Emit event: site is live.
pub fn emit_deploy_succeeded(deployment_id: &str, attempts_used: u32, deploy_url: &str) {
    info!(
        event = "deploy.succeeded",
        deployment_id = %deployment_id,
        attempts_used,
        deploy_url = %deploy_url,
    );
}

/// Emit event: attempt budget exhausted without a live site.
pub fn emit_deploy_exhausted(deployment_id: &str, attempts_used: u32) {
    info!(
        event = "deploy.exhausted",
        deployment_id = %deployment_id,
        attempts_used,
    );
}

/// Emit event: caller cancelled the orchestration.
pub fn emit_deploy_cancelled(deployment_id: &str, attempts_used: u32) {
    info!(
        event = "deploy.cancelled",
        deployment_id = %deployment_id,
        attempts_used,
    );
}
