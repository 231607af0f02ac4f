//! Deployment executor.
//!
//! Performs one deployment attempt: fail-fast preflight validation of
//! the file set, then project provisioning and upload through the
//! injected [`HostingProvider`]. This is the only module that talks to
//! real hosting infrastructure.

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capability::HostingProvider;
use crate::classify::ErrorContext;
use crate::domain::{BerthError, DeployConfig, FileSet, Result};

/// Canonical entry-point paths a deployable site must contain one of.
const ENTRY_POINTS: &[&str] = &[
    "index.html",
    "index.tsx",
    "index.ts",
    "src/index.tsx",
    "src/index.ts",
];

const MANIFEST_PATH: &str = "package.json";

/// Identifiers for a successfully deployed site.
///
/// URLs are derived deterministically from the sanitized project name,
/// so repeated deploys of the same project land on the same site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteHandle {
    pub site_id: String,
    pub name: String,
    pub deploy_url: String,
    pub admin_url: String,
}

impl SiteHandle {
    fn for_project(site_id: String, name: String) -> Self {
        let deploy_url = format!("https://{}.netlify.app", name);
        let admin_url = format!("https://app.netlify.com/sites/{}", name);
        Self {
            site_id,
            name,
            deploy_url,
            admin_url,
        }
    }
}

/// Outcome of one executed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success {
        logs: Option<String>,
        site: SiteHandle,
    },
    Failure {
        raw_message: String,
        context: ErrorContext,
    },
}

impl ExecutionOutcome {
    fn failed(raw_message: impl Into<String>) -> Self {
        Self::Failure {
            raw_message: raw_message.into(),
            context: ErrorContext::default(),
        }
    }
}

/// One-attempt deployment executor over an injected provider.
pub struct Executor {
    provider: Arc<dyn HostingProvider>,
}

impl Executor {
    pub fn new(provider: Arc<dyn HostingProvider>) -> Self {
        Self { provider }
    }

    /// Run a single deployment attempt.
    ///
    /// Validation failures come back as `Failure` outcomes; only
    /// infrastructure errors from the provider surface as `Err`, and the
    /// orchestrator translates those into runtime-classified failures.
    pub async fn execute(
        &self,
        config: &DeployConfig,
        files: &FileSet,
    ) -> Result<ExecutionOutcome> {
        if let Some(failure) = preflight(files) {
            debug!("preflight rejected file set before provider call");
            return Ok(failure);
        }

        let name = config.sanitized_project_name();
        if name.is_empty() {
            return Err(BerthError::InvalidConfig(
                "project name sanitizes to an empty site name".to_string(),
            ));
        }

        let project = self.provider.create_project(&name, config).await?;
        info!(site_id = %project.id, site_name = %project.name, "project ready, uploading files");

        let outcome = self.provider.deploy(&project.id, config, files).await?;
        if outcome.success {
            Ok(ExecutionOutcome::Success {
                logs: outcome.logs,
                site: SiteHandle::for_project(project.id, project.name),
            })
        } else {
            Ok(ExecutionOutcome::failed(
                outcome
                    .error_message
                    .unwrap_or_else(|| "deployment failed".to_string()),
            ))
        }
    }
}

/// Fail-fast validation before any network call.
fn preflight(files: &FileSet) -> Option<ExecutionOutcome> {
    if files.is_empty() {
        return Some(ExecutionOutcome::failed("no files provided"));
    }

    if !ENTRY_POINTS.iter().any(|entry| files.contains(entry)) {
        return Some(ExecutionOutcome::failed(
            "no entry point found (index.html, index.tsx, or index.ts)",
        ));
    }

    // A manifest without vendored dependencies means the provider will
    // run an install step; cross-check imports against declarations so
    // an undeclared package fails here instead of minutes into a build.
    let vendored = files.any_path(|path| path.contains("node_modules"));
    if files.contains(MANIFEST_PATH) && !vendored {
        return build_preflight(files);
    }

    None
}

/// Deterministic build check: every bare import specifier in source
/// files must be declared in the manifest.
fn build_preflight(files: &FileSet) -> Option<ExecutionOutcome> {
    let manifest = files.get(MANIFEST_PATH)?;
    let declared = match declared_dependencies(manifest) {
        Ok(declared) => declared,
        Err(err) => {
            return Some(ExecutionOutcome::Failure {
                raw_message: format!("syntax error in package.json: {}", err),
                context: ErrorContext::at(MANIFEST_PATH, None),
            });
        }
    };

    for file in files.iter() {
        if !is_source_path(&file.path) || file.path.contains("node_modules") {
            continue;
        }
        for specifier in bare_import_specifiers(&file.content) {
            let package = package_of(&specifier);
            if !declared.contains(package) {
                return Some(ExecutionOutcome::Failure {
                    raw_message: format!("build failed: module not found: {}", package),
                    context: ErrorContext::at(file.path.clone(), None),
                });
            }
        }
    }

    None
}

fn declared_dependencies(manifest: &str) -> std::result::Result<BTreeSet<String>, serde_json::Error> {
    #[derive(Deserialize, Default)]
    struct Manifest {
        #[serde(default)]
        dependencies: serde_json::Map<String, serde_json::Value>,
        #[serde(default, rename = "devDependencies")]
        dev_dependencies: serde_json::Map<String, serde_json::Value>,
        #[serde(default, rename = "peerDependencies")]
        peer_dependencies: serde_json::Map<String, serde_json::Value>,
    }

    let manifest: Manifest = serde_json::from_str(manifest)?;
    Ok(manifest
        .dependencies
        .keys()
        .chain(manifest.dev_dependencies.keys())
        .chain(manifest.peer_dependencies.keys())
        .cloned()
        .collect())
}

fn is_source_path(path: &str) -> bool {
    [".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

/// Extract bare (non-relative) module specifiers from `import`/`require`.
fn bare_import_specifiers(source: &str) -> Vec<String> {
    let patterns = [
        Regex::new(r#"import\s+[^'";]*?from\s*['"]([^'"]+)['"]"#).expect("static regex"),
        Regex::new(r#"import\s*['"]([^'"]+)['"]"#).expect("static regex"),
        Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("static regex"),
    ];

    let mut specifiers = Vec::new();
    for pattern in &patterns {
        for captures in pattern.captures_iter(source) {
            let specifier = &captures[1];
            if !specifier.starts_with('.') && !specifier.starts_with('/') {
                specifiers.push(specifier.to_string());
            }
        }
    }
    specifiers
}

/// Package name of a specifier: first segment, or first two for scopes.
fn package_of(specifier: &str) -> &str {
    let mut indices = specifier.match_indices('/').map(|(i, _)| i);
    if specifier.starts_with('@') {
        indices.next();
    }
    match indices.next() {
        Some(i) => &specifier[..i],
        None => specifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SiteFile;
    use crate::fakes::ScriptedHostingProvider;

    fn executor(provider: Arc<ScriptedHostingProvider>) -> Executor {
        Executor::new(provider)
    }

    fn assert_failed_with(outcome: &ExecutionOutcome, expected: &str) {
        match outcome {
            ExecutionOutcome::Failure { raw_message, .. } => {
                assert!(
                    raw_message.contains(expected),
                    "expected {:?} in {:?}",
                    expected,
                    raw_message
                );
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_set_fails_before_provider_call() {
        let provider = Arc::new(ScriptedHostingProvider::new());
        let outcome = executor(provider.clone())
            .execute(&DeployConfig::default(), &FileSet::new())
            .await
            .unwrap();

        assert_failed_with(&outcome, "no files provided");
        assert_eq!(provider.deploy_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_point_fails() {
        let provider = Arc::new(ScriptedHostingProvider::new());
        let files = FileSet::from_files([SiteFile::new("about.html", "<p>about</p>")]);
        let outcome = executor(provider)
            .execute(&DeployConfig::default(), &files)
            .await
            .unwrap();

        assert_failed_with(&outcome, "no entry point found");
    }

    #[tokio::test]
    async fn test_plain_site_deploys_with_derived_urls() {
        let provider = Arc::new(ScriptedHostingProvider::new());
        let files = FileSet::from_files([SiteFile::new("index.html", "<h1>Hi</h1>")]);
        let config = DeployConfig::new("My Demo Site");

        let outcome = executor(provider).execute(&config, &files).await.unwrap();
        match outcome {
            ExecutionOutcome::Success { site, logs } => {
                assert_eq!(site.name, "my-demo-site");
                assert_eq!(site.deploy_url, "https://my-demo-site.netlify.app");
                assert_eq!(site.admin_url, "https://app.netlify.com/sites/my-demo-site");
                assert!(logs.is_some());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undeclared_import_fails_build_preflight() {
        let provider = Arc::new(ScriptedHostingProvider::new());
        let files = FileSet::from_files([
            SiteFile::new("index.html", "<script src=\"app.js\"></script>"),
            SiteFile::new("app.js", "import _ from 'lodash';"),
            SiteFile::new("package.json", r#"{"dependencies": {}}"#),
        ]);

        let outcome = executor(provider.clone())
            .execute(&DeployConfig::default(), &files)
            .await
            .unwrap();

        assert_failed_with(&outcome, "build failed: module not found: lodash");
        assert_eq!(provider.deploy_count(), 0);
    }

    #[tokio::test]
    async fn test_declared_imports_pass_build_preflight() {
        let provider = Arc::new(ScriptedHostingProvider::new());
        let files = FileSet::from_files([
            SiteFile::new("index.html", "<h1>Hi</h1>"),
            SiteFile::new("app.js", "import _ from 'lodash';\nimport './local.js';"),
            SiteFile::new("package.json", r#"{"dependencies": {"lodash": "^4"}}"#),
        ]);

        let outcome = executor(provider)
            .execute(&DeployConfig::default(), &files)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn test_vendored_marker_skips_build_preflight() {
        let provider = Arc::new(ScriptedHostingProvider::new());
        let files = FileSet::from_files([
            SiteFile::new("index.html", "<h1>Hi</h1>"),
            SiteFile::new("app.js", "import _ from 'lodash';"),
            SiteFile::new("package.json", r#"{"dependencies": {}}"#),
            SiteFile::new("node_modules/lodash/index.js", "module.exports = {}"),
        ]);

        let outcome = executor(provider)
            .execute(&DeployConfig::default(), &files)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_a_syntax_error() {
        let provider = Arc::new(ScriptedHostingProvider::new());
        let files = FileSet::from_files([
            SiteFile::new("index.html", "<h1>Hi</h1>"),
            SiteFile::new("package.json", "{not json"),
        ]);

        let outcome = executor(provider)
            .execute(&DeployConfig::default(), &files)
            .await
            .unwrap();
        assert_failed_with(&outcome, "syntax error in package.json");
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_failure_outcome() {
        let provider = Arc::new(ScriptedHostingProvider::failing_with([
            "Build failed: Module not found",
        ]));
        let files = FileSet::from_files([SiteFile::new("index.html", "<h1>Hi</h1>")]);

        let outcome = executor(provider)
            .execute(&DeployConfig::default(), &files)
            .await
            .unwrap();
        assert_failed_with(&outcome, "Module not found");
    }

    #[test]
    fn test_bare_specifier_extraction() {
        let source = "import React from 'react';\n\
                      import { deep } from '@scope/pkg/deep';\n\
                      import './styles.css';\n\
                      const x = require('lodash/fp');";
        let specifiers = bare_import_specifiers(source);
        assert!(specifiers.contains(&"react".to_string()));
        assert!(specifiers.contains(&"@scope/pkg/deep".to_string()));
        assert!(specifiers.contains(&"lodash/fp".to_string()));
        assert!(!specifiers.iter().any(|s| s.contains("styles")));
    }

    #[test]
    fn test_package_of_handles_scopes_and_subpaths() {
        assert_eq!(package_of("react"), "react");
        assert_eq!(package_of("lodash/fp"), "lodash");
        assert_eq!(package_of("@scope/pkg"), "@scope/pkg");
        assert_eq!(package_of("@scope/pkg/deep"), "@scope/pkg");
    }
}
