//! Domain models for berth.
//!
//! Canonical definitions for the core entities:
//! - `FileSet`: Immutable deployable artifact (path/content pairs)
//! - `DeployConfig`: Immutable input to a deployment attempt
//! - `AttemptRecord`: One entry in the attempt history
//! - `DeploymentResult`: Terminal value of an orchestration

pub mod attempt;
pub mod config;
pub mod error;
pub mod fileset;

// Re-export main types and errors
pub use attempt::{
    AttemptOutcome, AttemptRecord, DeploymentResult, FailureReason, GENERIC_SUGGESTIONS,
};
pub use config::DeployConfig;
pub use error::{BerthError, Result};
pub use fileset::{FileSet, SiteFile};
