//! Gemini completion backend.
//!
//! Implements [`CompletionModel`] against the Gemini `generateContent`
//! REST endpoint. The adapter stays deliberately thin: prompt framing
//! and reply parsing belong to `berth_core::repair`; this module only
//! moves text in and out.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use berth_core::{BerthError, CompletionModel};

use crate::error::ProviderApiError;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
const USER_AGENT: &str = concat!("berth/", env!("CARGO_PKG_VERSION"));

/// Gemini connection settings, usually read from the environment.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            api_key: std::env::var("GEMINI_API_KEY").ok(),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(api_base: &str, api_key: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: Some(api_key.to_string()),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Completion model backed by the Gemini API.
pub struct GeminiModel {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiModel {
    pub fn new(config: GeminiConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("HTTP client with static configuration");
        Self {
            config,
            http_client,
        }
    }

    pub fn from_env() -> Self {
        Self::new(GeminiConfig::from_env())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
        )
    }

    async fn generate_inner(&self, prompt: &str) -> Result<String, ProviderApiError> {
        let api_key = self.config.api_key.as_deref().ok_or(
            ProviderApiError::MissingCredentials("completion model", "GEMINI_API_KEY"),
        )?;

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderApiError::ApiStatus {
                service: "gemini",
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|err| ProviderApiError::MalformedResponse {
                service: "gemini",
                detail: err.to_string(),
            })?;
        let reply = first_candidate_text(&parsed).ok_or(ProviderApiError::MalformedResponse {
            service: "gemini",
            detail: "no candidates in response".to_string(),
        })?;
        debug!(chars = reply.len(), "model reply received");
        Ok(reply)
    }
}

fn first_candidate_text(response: &GenerateResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let text = candidate
        .content
        .parts
        .iter()
        .map(|part| part.text.as_str())
        .collect::<String>();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl CompletionModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> berth_core::Result<String> {
        self.generate_inner(prompt).await.map_err(|err| match err {
            ProviderApiError::MissingCredentials(..) => BerthError::ModelUnavailable,
            other => BerthError::ModelError(other.to_string()),
        })
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> GeminiModel {
        GeminiModel::new(GeminiConfig::new(
            "https://generativelanguage.example.com/v1beta",
            "key-123",
        ))
    }

    #[test]
    fn test_endpoint_includes_model() {
        let model = with_key();
        assert_eq!(
            model.endpoint(),
            "https://generativelanguage.example.com/v1beta/models/gemini-2.0-flash-001:generateContent"
        );
    }

    #[test]
    fn test_availability_follows_key() {
        assert!(with_key().is_available());

        let model = GeminiModel::new(GeminiConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        });
        assert!(!model.is_available());
    }

    #[tokio::test]
    async fn test_generate_without_key_is_unavailable() {
        let model = GeminiModel::new(GeminiConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        });
        let err = model.generate("hello").await.unwrap_err();
        assert!(matches!(err, BerthError::ModelUnavailable));
    }

    #[test]
    fn test_candidate_text_concatenates_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}]}"#,
        )
        .expect("deserialize");
        assert_eq!(first_candidate_text(&response).unwrap(), "Hello world");
    }

    #[test]
    fn test_empty_candidates_yield_none() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates": []}"#).expect("deserialize");
        assert!(first_candidate_text(&response).is_none());
    }
}
