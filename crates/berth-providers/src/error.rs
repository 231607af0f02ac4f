//! Error types for berth provider backends.

use thiserror::Error;

/// Errors from the HTTP capability backends.
#[derive(Error, Debug)]
pub enum ProviderApiError {
    /// Credential missing from the environment
    #[error("{0} is not configured (set {1})")]
    MissingCredentials(&'static str, &'static str),

    /// Remote API answered with a non-success status
    #[error("{service} returned {status}: {body}")]
    ApiStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("malformed {service} response: {detail}")]
    MalformedResponse {
        service: &'static str,
        detail: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProviderApiError {
    fn from(err: reqwest::Error) -> Self {
        ProviderApiError::Http(err.to_string())
    }
}

impl From<ProviderApiError> for berth_core::BerthError {
    fn from(err: ProviderApiError) -> Self {
        match err {
            ProviderApiError::MissingCredentials("completion model", _) => {
                berth_core::BerthError::ModelUnavailable
            }
            other => berth_core::BerthError::ProviderError(other.to_string()),
        }
    }
}
