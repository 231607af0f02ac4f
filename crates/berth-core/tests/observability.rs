//! Observability tests for deployment lifecycle tracing.
//!
//! These tests verify that structured tracing events are emitted without
//! panicking for key lifecycle events: start, attempt, failure, repair
//! request, success, exhaustion, and cancellation.

use berth_core::{
    emit_attempt_failed, emit_attempt_started, emit_deploy_cancelled, emit_deploy_exhausted,
    emit_deploy_started, emit_deploy_succeeded, emit_repair_requested, DeploySpan, ErrorKind,
    METRICS,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_deploy_started_logs_project_and_file_count() {
    emit_deploy_started("deploy-123", "my-demo-site", 4);
}

#[traced_test]
#[test]
fn test_emit_attempt_lifecycle_events() {
    emit_attempt_started("deploy-123", 1, 3);
    emit_attempt_failed(
        "deploy-123",
        1,
        ErrorKind::Dependency,
        "Module not found: lodash",
    );
    emit_repair_requested("deploy-123", 1);
}

#[traced_test]
#[test]
fn test_emit_terminal_events() {
    emit_deploy_succeeded("deploy-123", 2, "https://my-demo-site.netlify.app");
    emit_deploy_exhausted("deploy-456", 3);
    emit_deploy_cancelled("deploy-789", 1);
}

#[traced_test]
#[test]
fn test_deploy_span_enter_creates_span() {
    let span = DeploySpan::enter("deploy-span-test");
    tracing::info!("inside the deployment span");
    drop(span);
}

#[test]
fn test_metrics_flush_does_not_panic() {
    METRICS.inc_deploys_started();
    METRICS.inc_attempts_executed();
    METRICS.flush();
    assert!(METRICS.deploys_started() >= 1);
}
