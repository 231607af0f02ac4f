//! Domain-level error taxonomy for berth.

/// berth domain errors.
#[derive(Debug, thiserror::Error)]
pub enum BerthError {
    #[error("invalid deploy config: {0}")]
    InvalidConfig(String),

    #[error("completion model is not configured")]
    ModelUnavailable,

    #[error("completion model call failed: {0}")]
    ModelError(String),

    #[error("hosting provider error: {0}")]
    ProviderError(String),

    #[error("deployment cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for berth domain operations.
pub type Result<T> = std::result::Result<T, BerthError>;
