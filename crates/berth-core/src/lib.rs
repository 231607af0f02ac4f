//! berth Core Library
//!
//! Self-repairing deployment orchestration: deploy a set of generated
//! site files through an injected hosting provider and, when an attempt
//! fails, classify the error and ask an injected completion model for a
//! revised file set before retrying, up to a bounded number of attempts.

pub mod capability;
pub mod classify;
pub mod domain;
pub mod executor;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod repair;
pub mod telemetry;

pub use capability::{CompletionModel, DeployOutcome, HostingProvider, ProjectHandle, SiteInfo};

pub use classify::{classify_error, runtime_fallback, ErrorClassification, ErrorContext, ErrorKind};

pub use domain::{
    AttemptOutcome, AttemptRecord, BerthError, DeployConfig, DeploymentResult, FailureReason,
    FileSet, Result, SiteFile, GENERIC_SUGGESTIONS,
};

pub use executor::{ExecutionOutcome, Executor, SiteHandle};

pub use orchestrator::{CancelHandle, Orchestrator, OrchestratorPolicy};

pub use repair::{RepairOracle, RepairProposal};

pub use metrics::METRICS;
pub use obs::{
    emit_attempt_failed, emit_attempt_started, emit_deploy_cancelled, emit_deploy_exhausted,
    emit_deploy_started, emit_deploy_succeeded, emit_repair_requested, DeploySpan,
};
pub use telemetry::init_tracing;

/// berth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
