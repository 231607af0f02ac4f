//! Attempt records and terminal deployment results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ErrorClassification;

/// Fallback suggestions when no classification was produced for the
/// final failure (e.g. the repair oracle itself failed first).
pub const GENERIC_SUGGESTIONS: &[&str] = &[
    "Check your build configuration",
    "Verify all dependencies are correctly specified",
    "Review environment variables",
    "Check for syntax errors in your code",
];

/// Outcome of a single deployment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// One entry in the attempt history. Created once per loop iteration
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt_number: u32,

    pub outcome: AttemptOutcome,

    /// Raw failure message as reported by the executor; absent on success.
    pub raw_message: Option<String>,

    /// Classification of the failure; absent on success.
    pub classification: Option<ErrorClassification>,

    /// Build/deploy logs when the provider supplied any.
    pub logs: Option<String>,

    pub recorded_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn success(attempt_number: u32, logs: Option<String>) -> Self {
        Self {
            attempt_number,
            outcome: AttemptOutcome::Success,
            raw_message: None,
            classification: None,
            logs,
            recorded_at: Utc::now(),
        }
    }

    pub fn failure(
        attempt_number: u32,
        raw_message: impl Into<String>,
        classification: Option<ErrorClassification>,
        logs: Option<String>,
    ) -> Self {
        Self {
            attempt_number,
            outcome: AttemptOutcome::Failure,
            raw_message: Some(raw_message.into()),
            classification,
            logs,
            recorded_at: Utc::now(),
        }
    }
}

/// Why a failed orchestration stopped looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// All attempts were consumed.
    Exhausted,
    /// The caller cancelled the orchestration mid-loop.
    Cancelled,
}

/// Terminal value of an orchestration. Created once at loop termination.
///
/// A failed result always carries a human-readable `error_message` and a
/// non-empty `suggestions` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub success: bool,

    /// Public site URL; present on success only.
    pub deploy_url: Option<String>,

    /// Provider dashboard URL; present on success only.
    pub admin_url: Option<String>,

    pub error_message: Option<String>,

    pub suggestions: Vec<String>,

    pub failure_reason: Option<FailureReason>,

    /// Every attempt made, in order. Success can only be the last entry.
    pub attempt_history: Vec<AttemptRecord>,
}
