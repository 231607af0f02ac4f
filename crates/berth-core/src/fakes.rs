//! In-memory fakes for capability traits (testing only)
//!
//! Provides `ScriptedHostingProvider` and `ScriptedModel` that satisfy
//! the trait contracts without any network access. Outcomes and
//! responses are queued up front, so tests control every attempt of the
//! retry loop deterministically.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::capability::{
    CompletionModel, DeployOutcome, HostingProvider, ProjectHandle, SiteInfo,
};
use crate::domain::{BerthError, DeployConfig, FileSet, Result};

const FAKE_DEPLOY_LOGS: &str = "Build started\n\
Installing dependencies...\n\
Building application...\n\
Optimizing assets...\n\
Deployment successful!";

// ---------------------------------------------------------------------------
// ScriptedHostingProvider
// ---------------------------------------------------------------------------

/// One recorded `deploy` call, for asserting what the loop sent.
#[derive(Debug, Clone)]
pub struct RecordedDeploy {
    pub project_id: String,
    pub files: FileSet,
}

/// In-memory hosting provider with queued deploy outcomes.
///
/// Each `deploy` call pops the next queued outcome; when the queue is
/// empty the deploy succeeds with canned logs. Every call is recorded
/// with a clone of the file set it received.
#[derive(Debug, Default)]
pub struct ScriptedHostingProvider {
    outcomes: Mutex<VecDeque<DeployOutcome>>,
    deploys: Mutex<Vec<RecordedDeploy>>,
    projects: Mutex<Vec<ProjectHandle>>,
}

impl ScriptedHostingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose first deploys fail with the given messages, then succeed.
    pub fn failing_with(messages: impl IntoIterator<Item = &'static str>) -> Self {
        let provider = Self::new();
        for message in messages {
            provider.push_outcome(DeployOutcome::failed(message));
        }
        provider
    }

    /// Queue the outcome for the next unanswered `deploy` call.
    pub fn push_outcome(&self, outcome: DeployOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// All `deploy` calls made so far, in order.
    pub fn recorded_deploys(&self) -> Vec<RecordedDeploy> {
        self.deploys.lock().unwrap().clone()
    }

    /// Number of `deploy` calls made so far.
    pub fn deploy_count(&self) -> usize {
        self.deploys.lock().unwrap().len()
    }
}

#[async_trait]
impl HostingProvider for ScriptedHostingProvider {
    async fn create_project(&self, name: &str, _config: &DeployConfig) -> Result<ProjectHandle> {
        let mut projects = self.projects.lock().unwrap();
        if let Some(existing) = projects.iter().find(|p| p.name == name) {
            return Ok(existing.clone());
        }
        let handle = ProjectHandle {
            id: format!("site_{}", projects.len() + 1),
            name: name.to_string(),
        };
        projects.push(handle.clone());
        Ok(handle)
    }

    async fn deploy(
        &self,
        project_id: &str,
        _config: &DeployConfig,
        files: &FileSet,
    ) -> Result<DeployOutcome> {
        self.deploys.lock().unwrap().push(RecordedDeploy {
            project_id: project_id.to_string(),
            files: files.clone(),
        });
        let next = self.outcomes.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| DeployOutcome::succeeded(FAKE_DEPLOY_LOGS)))
    }

    async fn list_projects(&self) -> Result<Vec<SiteInfo>> {
        let projects = self.projects.lock().unwrap();
        Ok(projects
            .iter()
            .map(|p| SiteInfo {
                id: p.id.clone(),
                name: p.name.clone(),
                url: format!("https://{}.netlify.app", p.name),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

/// In-memory completion model with queued responses.
///
/// `generate` pops the next queued response; an empty queue is a model
/// error, so a test that forgets to script a response fails loudly
/// instead of looping silently.
#[derive(Debug)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    available: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            available: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Model that is not configured; `generate` always fails.
    pub fn unavailable() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            available: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt the model has been asked to complete, in order.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if !self.available {
            return Err(BerthError::ModelUnavailable);
        }
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BerthError::ModelError("no scripted response queued".to_string()))
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SiteFile;

    #[tokio::test]
    async fn test_scripted_provider_pops_outcomes_in_order() {
        let provider = ScriptedHostingProvider::failing_with(["boom"]);
        let config = DeployConfig::default();
        let files = FileSet::from_files([SiteFile::new("index.html", "<h1>Hi</h1>")]);

        let first = provider.deploy("site_1", &config, &files).await.unwrap();
        assert!(!first.success);
        assert_eq!(first.error_message.as_deref(), Some("boom"));

        let second = provider.deploy("site_1", &config, &files).await.unwrap();
        assert!(second.success);
        assert_eq!(provider.deploy_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_provider_reuses_named_project() {
        let provider = ScriptedHostingProvider::new();
        let config = DeployConfig::default();

        let a = provider.create_project("demo", &config).await.unwrap();
        let b = provider.create_project("demo", &config).await.unwrap();
        assert_eq!(a, b);

        let sites = provider.list_projects().await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].url, "https://demo.netlify.app");
    }

    #[tokio::test]
    async fn test_unavailable_model_rejects_generation() {
        let model = ScriptedModel::unavailable();
        assert!(!model.is_available());
        let err = model.generate("fix this").await.unwrap_err();
        assert!(matches!(err, BerthError::ModelUnavailable));
    }

    #[tokio::test]
    async fn test_scripted_model_records_prompts() {
        let model = ScriptedModel::new(["ok".to_string()]);
        let reply = model.generate("hello").await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(model.recorded_prompts(), vec!["hello".to_string()]);
    }
}
