//! Netlify hosting backend.
//!
//! Implements [`HostingProvider`] against the Netlify REST API using the
//! file-digest deploy protocol: announce a path -> SHA1 manifest, then
//! upload only the files Netlify reports as missing, then poll the
//! deploy until it settles.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use berth_core::{
    BerthError, DeployConfig, DeployOutcome, FileSet, HostingProvider, ProjectHandle, SiteInfo,
};

use crate::error::ProviderApiError;

const DEFAULT_API_BASE: &str = "https://api.netlify.com/api/v1";
const USER_AGENT: &str = concat!("berth/", env!("CARGO_PKG_VERSION"));

/// How long to wait for a deploy to leave its processing states.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLLS: u32 = 60;

/// Netlify connection settings, usually read from the environment.
#[derive(Debug, Clone)]
pub struct NetlifyConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub team_slug: Option<String>,
}

impl Default for NetlifyConfig {
    fn default() -> Self {
        Self {
            api_base: std::env::var("NETLIFY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            token: std::env::var("NETLIFY_AUTH_TOKEN").ok(),
            team_slug: std::env::var("NETLIFY_TEAM_SLUG").ok(),
        }
    }
}

impl NetlifyConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: Some(token.to_string()),
            team_slug: None,
        }
    }
}

/// Hosting provider backed by the Netlify API.
pub struct NetlifyProvider {
    config: NetlifyConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SiteResponse {
    id: String,
    name: String,
    #[serde(default)]
    ssl_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeployResponse {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl NetlifyProvider {
    pub fn new(config: NetlifyConfig) -> Self {
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
        Self::new(NetlifyConfig::from_env())
    }

    /// Whether credentials are configured.
    pub fn is_configured(&self) -> bool {
        self.config.token.is_some()
    }

    fn token(&self) -> Result<&str, ProviderApiError> {
        self.config.token.as_deref().ok_or(ProviderApiError::MissingCredentials(
            "hosting provider",
            "NETLIFY_AUTH_TOKEN",
        ))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderApiError::ApiStatus {
                service: "netlify",
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|err| ProviderApiError::MalformedResponse {
            service: "netlify",
            detail: err.to_string(),
        })
    }

    async fn find_site_by_name(&self, name: &str) -> Result<Option<SiteResponse>, ProviderApiError> {
        let token = self.token()?;
        let response = self
            .http_client
            .get(self.url("/sites"))
            .bearer_auth(token)
            .query(&[("name", name)])
            .send()
            .await?;
        let sites: Vec<SiteResponse> = Self::read_json(response).await?;
        Ok(sites.into_iter().find(|site| site.name == name))
    }

    async fn create_site(&self, name: &str) -> Result<SiteResponse, ProviderApiError> {
        let token = self.token()?;
        let mut body = serde_json::json!({ "name": name });
        if let Some(team) = &self.config.team_slug {
            body["account_slug"] = serde_json::Value::String(team.clone());
        }
        let response = self
            .http_client
            .post(self.url("/sites"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn upload_required(
        &self,
        deploy_id: &str,
        files: &FileSet,
        required: &[String],
        digests: &BTreeMap<String, String>,
    ) -> Result<usize, ProviderApiError> {
        let token = self.token()?;
        let mut uploaded = 0usize;
        for file in files.iter() {
            let digest = digests
                .get(&file.path)
                .expect("digest computed for every file");
            if !required.contains(digest) {
                continue;
            }
            let response = self
                .http_client
                .put(self.url(&format!("/deploys/{}/files/{}", deploy_id, file.path)))
                .bearer_auth(token)
                .header("content-type", "application/octet-stream")
                .body(file.content.clone())
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ProviderApiError::ApiStatus {
                    service: "netlify",
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
            uploaded += 1;
        }
        Ok(uploaded)
    }

    async fn wait_for_deploy(&self, deploy_id: &str) -> Result<DeployResponse, ProviderApiError> {
        let token = self.token()?;
        for _ in 0..MAX_POLLS {
            let response = self
                .http_client
                .get(self.url(&format!("/deploys/{}", deploy_id)))
                .bearer_auth(token)
                .send()
                .await?;
            let deploy: DeployResponse = Self::read_json(response).await?;
            match deploy.state.as_str() {
                "ready" | "error" => return Ok(deploy),
                state => debug!(deploy_id, state, "deploy still processing"),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Err(ProviderApiError::MalformedResponse {
            service: "netlify",
            detail: format!("deploy {} did not settle in time", deploy_id),
        })
    }
}

/// Netlify's deploy protocol keys manifests by `/`-prefixed path and
/// SHA1 content digests.
fn digest_manifest(files: &FileSet) -> (BTreeMap<String, String>, serde_json::Value) {
    let mut digests = BTreeMap::new();
    let mut manifest = serde_json::Map::new();
    for file in files.iter() {
        let mut hasher = Sha1::new();
        hasher.update(file.content.as_bytes());
        let digest = hex::encode(hasher.finalize());
        manifest.insert(
            format!("/{}", file.path),
            serde_json::Value::String(digest.clone()),
        );
        digests.insert(file.path.clone(), digest);
    }
    (digests, serde_json::json!({ "files": manifest }))
}

#[async_trait]
impl HostingProvider for NetlifyProvider {
    async fn create_project(&self, name: &str, _config: &DeployConfig) -> berth_core::Result<ProjectHandle> {
        if let Some(existing) = self.find_site_by_name(name).await.map_err(BerthError::from)? {
            info!(site_id = %existing.id, name, "reusing existing site");
            return Ok(ProjectHandle {
                id: existing.id,
                name: existing.name,
            });
        }

        let site = self.create_site(name).await.map_err(BerthError::from)?;
        info!(site_id = %site.id, name = %site.name, "created site");
        Ok(ProjectHandle {
            id: site.id,
            name: site.name,
        })
    }

    async fn deploy(
        &self,
        project_id: &str,
        _config: &DeployConfig,
        files: &FileSet,
    ) -> berth_core::Result<DeployOutcome> {
        let (digests, manifest) = digest_manifest(files);

        let token = self.token().map_err(BerthError::from)?;
        let response = self
            .http_client
            .post(self.url(&format!("/sites/{}/deploys", project_id)))
            .bearer_auth(token)
            .json(&manifest)
            .send()
            .await
            .map_err(ProviderApiError::from)
            .map_err(BerthError::from)?;
        let deploy: DeployResponse = Self::read_json(response).await.map_err(BerthError::from)?;

        let uploaded = self
            .upload_required(&deploy.id, files, &deploy.required, &digests)
            .await
            .map_err(BerthError::from)?;
        debug!(deploy_id = %deploy.id, uploaded, total = files.len(), "file upload complete");

        let settled = self
            .wait_for_deploy(&deploy.id)
            .await
            .map_err(BerthError::from)?;
        if settled.state == "ready" {
            Ok(DeployOutcome::succeeded(format!(
                "uploaded {} of {} files, deploy {} ready",
                uploaded,
                files.len(),
                settled.id,
            )))
        } else {
            let message = settled
                .error_message
                .unwrap_or_else(|| "deployment failed".to_string());
            warn!(deploy_id = %settled.id, message = %message, "deploy failed");
            Ok(DeployOutcome::failed(message))
        }
    }

    async fn list_projects(&self) -> berth_core::Result<Vec<SiteInfo>> {
        let token = self.token().map_err(BerthError::from)?;
        let response = self
            .http_client
            .get(self.url("/sites"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(ProviderApiError::from)
            .map_err(BerthError::from)?;
        let sites: Vec<SiteResponse> = Self::read_json(response).await.map_err(BerthError::from)?;
        Ok(sites
            .into_iter()
            .map(|site| {
                let url = site
                    .ssl_url
                    .or(site.url)
                    .unwrap_or_else(|| format!("https://{}.netlify.app", site.name));
                SiteInfo {
                    id: site.id,
                    name: site.name,
                    url,
                }
            })
            .collect())
    }
}
