//! Deployment orchestrator.
//!
//! The bounded retry state machine at the heart of berth:
//! `Idle -> Attempting -> (Succeeded | Repairing -> Attempting) -> Exhausted`.
//! Each attempt runs the executor; on failure the raw message is
//! classified and the repair oracle proposes a revised file set for the
//! next attempt. Attempts are strictly sequential — attempt N+1 never
//! starts before attempt N's outcome is known, because its file set may
//! depend on N's error.
//!
//! Collaborators are injected, so independent orchestrations share no
//! mutable state and run concurrently without locks.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::capability::{CompletionModel, HostingProvider};
use crate::classify::{classify_error, runtime_fallback, ErrorClassification};
use crate::domain::{
    AttemptRecord, BerthError, DeployConfig, DeploymentResult, FailureReason, FileSet,
    GENERIC_SUGGESTIONS,
};
use crate::executor::{ExecutionOutcome, Executor, SiteHandle};
use crate::metrics::METRICS;
use crate::obs;
use crate::repair::RepairOracle;

const UNAVAILABLE_NOTE: &str =
    "Repair model was unavailable; files were retried unchanged";
const EXHAUSTED_MESSAGE: &str = "Deployment failed after multiple attempts";
const CANCELLED_MESSAGE: &str = "deployment cancelled";

/// Bounded retry policy for one orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorPolicy {
    /// Maximum deployment attempts before giving up. The default caps
    /// the cost of repeated provider and model calls.
    pub max_attempts: u32,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Cloneable handle that aborts a running orchestration.
///
/// Firing it interrupts the in-flight executor or oracle call and the
/// orchestration terminates with [`FailureReason::Cancelled`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Coordinates executor, classifier, and repair oracle across a bounded
/// retry loop. One instance per deployment request.
pub struct Orchestrator {
    executor: Executor,
    oracle: RepairOracle,
    policy: OrchestratorPolicy,
    deployment_id: Uuid,
    last_attempt: Mutex<Option<AttemptRecord>>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn HostingProvider>, model: Arc<dyn CompletionModel>) -> Self {
        Self::with_policy(provider, model, OrchestratorPolicy::default())
    }

    pub fn with_policy(
        provider: Arc<dyn HostingProvider>,
        model: Arc<dyn CompletionModel>,
        policy: OrchestratorPolicy,
    ) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            executor: Executor::new(provider),
            oracle: RepairOracle::new(model),
            policy,
            deployment_id: Uuid::new_v4(),
            last_attempt: Mutex::new(None),
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    /// Unique id of this orchestration, used to scope logs.
    pub fn deployment_id(&self) -> Uuid {
        self.deployment_id
    }

    /// Handle for aborting this orchestration from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Most recent attempt record, for live progress reporting.
    pub fn describe_last_attempt(&self) -> Option<AttemptRecord> {
        self.last_attempt.lock().unwrap().clone()
    }

    /// Deploy `files`, repairing and retrying on failure, up to the
    /// policy's attempt bound.
    ///
    /// Never returns early on executor or oracle errors — those are
    /// caught at this boundary, recorded as runtime-classified failures,
    /// and consume one attempt like any other failure. Only success,
    /// attempt exhaustion, or cancellation terminates the loop.
    pub async fn deploy_with_repair(
        &self,
        files: FileSet,
        config: &DeployConfig,
    ) -> DeploymentResult {
        use tracing::Instrument;
        let id = self.deployment_id.to_string();
        let span = tracing::info_span!("berth.deploy", deployment_id = %id);
        async move {
        obs::emit_deploy_started(&id, &config.project_name, files.len());
        METRICS.inc_deploys_started();

        let mut working = files;
        let mut history: Vec<AttemptRecord> = Vec::new();
        let mut last_classification: Option<ErrorClassification> = None;
        let mut model_was_unavailable = false;

        for attempt in 1..=self.policy.max_attempts {
            obs::emit_attempt_started(&id, attempt, self.policy.max_attempts);
            METRICS.inc_attempts_executed();

            let executed = self
                .run_cancellable(self.executor.execute(config, &working))
                .await;
            let executed = match executed {
                Some(executed) => executed,
                None => {
                    return self.cancelled(&id, history, last_classification, model_was_unavailable)
                }
            };

            let (raw_message, classification, logs) = match executed {
                Ok(ExecutionOutcome::Success { logs, site }) => {
                    return self.succeeded(&id, attempt, history, site, logs);
                }
                Ok(ExecutionOutcome::Failure {
                    raw_message,
                    context,
                }) => {
                    let classification = classify_error(&raw_message, context);
                    (raw_message, classification, None)
                }
                Err(BerthError::Cancelled) => {
                    return self.cancelled(&id, history, last_classification, model_was_unavailable)
                }
                Err(err) => {
                    // collaborator blew up mid-attempt; consume the
                    // attempt rather than aborting the loop
                    let raw_message = err.to_string();
                    let classification = runtime_fallback(&raw_message);
                    (raw_message, classification, None)
                }
            };

            obs::emit_attempt_failed(&id, attempt, classification.kind, &raw_message);
            let record = AttemptRecord::failure(
                attempt,
                raw_message,
                Some(classification.clone()),
                logs,
            );
            *self.last_attempt.lock().unwrap() = Some(record.clone());
            history.push(record);
            last_classification = Some(classification);

            if attempt < self.policy.max_attempts {
                obs::emit_repair_requested(&id, attempt);
                METRICS.inc_repairs_requested();

                let current = last_classification
                    .as_ref()
                    .expect("classification recorded for failed attempt");
                let proposed = self
                    .run_cancellable(self.oracle.propose_fix(current, &working))
                    .await;
                let proposed = match proposed {
                    Some(proposed) => proposed,
                    None => {
                        return self.cancelled(
                            &id,
                            history,
                            last_classification,
                            model_was_unavailable,
                        )
                    }
                };

                match proposed {
                    Ok(proposal) => {
                        if proposal.revised {
                            debug!(
                                suggestions = proposal.suggestions.len(),
                                "repair proposed a revised file set"
                            );
                        } else {
                            debug!("repair left the file set unchanged");
                        }
                        working = proposal.files;
                    }
                    Err(BerthError::ModelUnavailable) => {
                        // still worth retrying unchanged: a flaky
                        // provider failure may clear without edits
                        warn!("repair model unavailable; retrying with unchanged files");
                        model_was_unavailable = true;
                    }
                    Err(err) => {
                        warn!(error = %err, "repair failed; retrying with unchanged files");
                    }
                }
            }
        }

        obs::emit_deploy_exhausted(&id, history.len() as u32);
        METRICS.inc_deploys_exhausted();
        self.finish_failure(
            history,
            last_classification,
            model_was_unavailable,
            FailureReason::Exhausted,
        )
        }
        .instrument(span)
        .await
    }

    /// Await `operation` unless cancellation fires first.
    async fn run_cancellable<T>(&self, operation: impl std::future::Future<Output = T>) -> Option<T> {
        let mut cancel_rx = self.cancel_rx.clone();
        tokio::select! {
            biased;
            _ = cancel_rx.wait_for(|cancelled| *cancelled) => None,
            result = operation => Some(result),
        }
    }

    fn succeeded(
        &self,
        id: &str,
        attempt: u32,
        mut history: Vec<AttemptRecord>,
        site: SiteHandle,
        logs: Option<String>,
    ) -> DeploymentResult {
        let record = AttemptRecord::success(attempt, logs);
        *self.last_attempt.lock().unwrap() = Some(record.clone());
        history.push(record);

        obs::emit_deploy_succeeded(id, attempt, &site.deploy_url);
        METRICS.inc_deploys_succeeded();

        DeploymentResult {
            success: true,
            deploy_url: Some(site.deploy_url),
            admin_url: Some(site.admin_url),
            error_message: None,
            suggestions: Vec::new(),
            failure_reason: None,
            attempt_history: history,
        }
    }

    fn cancelled(
        &self,
        id: &str,
        history: Vec<AttemptRecord>,
        last_classification: Option<ErrorClassification>,
        model_was_unavailable: bool,
    ) -> DeploymentResult {
        obs::emit_deploy_cancelled(id, history.len() as u32);
        let mut result = self.finish_failure(
            history,
            last_classification,
            model_was_unavailable,
            FailureReason::Cancelled,
        );
        result.error_message = Some(CANCELLED_MESSAGE.to_string());
        result
    }

    /// Assemble the terminal failure value. Always carries an error
    /// message and a non-empty suggestion list.
    fn finish_failure(
        &self,
        history: Vec<AttemptRecord>,
        last_classification: Option<ErrorClassification>,
        model_was_unavailable: bool,
        reason: FailureReason,
    ) -> DeploymentResult {
        let error_message = last_classification
            .as_ref()
            .map(|c| c.message.clone())
            .unwrap_or_else(|| EXHAUSTED_MESSAGE.to_string());

        let mut suggestions = match &last_classification {
            Some(classification) => classification.remediation_hints.clone(),
            None => GENERIC_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        };
        if model_was_unavailable {
            suggestions.push(UNAVAILABLE_NOTE.to_string());
        }

        DeploymentResult {
            success: false,
            deploy_url: None,
            admin_url: None,
            error_message: Some(error_message),
            suggestions,
            failure_reason: Some(reason),
            attempt_history: history,
        }
    }
}
