//! Repair oracle adapter.
//!
//! Frames a structured repair request for a [`CompletionModel`] and
//! parses its reply into a revised [`FileSet`]. Parsing is tolerant:
//! models wrap payloads in fences or prose, so extraction is best-effort
//! and a reply that cannot be parsed degrades to "same files again"
//! instead of failing the attempt. The only error surfaced to the caller
//! is [`BerthError::ModelUnavailable`]; everything else is absorbed here.
//!
//! One outbound call per proposal, no internal retries — retry policy
//! belongs to the orchestrator.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capability::CompletionModel;
use crate::classify::ErrorClassification;
use crate::domain::{BerthError, FileSet, Result, SiteFile};

/// A revised file set plus advisory suggestions from the model.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairProposal {
    /// Files for the next attempt. Equal to the input set when the model
    /// produced nothing usable.
    pub files: FileSet,

    /// Advisory notes for the final result's suggestion list.
    pub suggestions: Vec<String>,

    /// Whether the proposal actually differs from the input set.
    pub revised: bool,
}

/// One file replacement in a model reply.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct FixEntry {
    #[serde(alias = "fileName", alias = "file_name")]
    path: String,
    content: String,
    #[serde(default)]
    #[allow(dead_code)]
    explanation: Option<String>,
}

/// Expected shape of a model reply, possibly embedded in prose.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct RepairResponse {
    #[serde(default)]
    fixes: Vec<FixEntry>,
    #[serde(default)]
    suggestions: Vec<String>,
}

/// Adapter around the injected completion capability.
pub struct RepairOracle {
    model: Arc<dyn CompletionModel>,
}

impl RepairOracle {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_available()
    }

    /// Ask the model for replacement files that fix `classification`.
    ///
    /// Returns `Err(ModelUnavailable)` when the capability is not
    /// configured. Any other model failure, and any unparsable reply,
    /// yields the input files unchanged.
    pub async fn propose_fix(
        &self,
        classification: &ErrorClassification,
        files: &FileSet,
    ) -> Result<RepairProposal> {
        if !self.model.is_available() {
            return Err(BerthError::ModelUnavailable);
        }

        let prompt = build_repair_prompt(classification, files);

        let reply = match self.model.generate(&prompt).await {
            Ok(reply) => reply,
            Err(BerthError::ModelUnavailable) => return Err(BerthError::ModelUnavailable),
            Err(err) => {
                warn!(error = %err, "repair generation failed; keeping files unchanged");
                return Ok(unchanged(files));
            }
        };

        let response = match parse_repair_reply(&reply) {
            Some(response) => response,
            None => {
                warn!("repair reply had no parsable payload; keeping files unchanged");
                return Ok(unchanged(files));
            }
        };

        let next = files.revise(
            response
                .fixes
                .into_iter()
                .map(|fix| SiteFile::new(fix.path, fix.content)),
        );
        let revised = next.revision_digest() != files.revision_digest();
        debug!(revised, suggestions = response.suggestions.len(), "repair proposal ready");

        Ok(RepairProposal {
            files: next,
            suggestions: response.suggestions,
            revised,
        })
    }
}

fn unchanged(files: &FileSet) -> RepairProposal {
    RepairProposal {
        files: files.clone(),
        suggestions: Vec::new(),
        revised: false,
    }
}

/// Frame the repair request: error context first, then every file in
/// full, then the required reply shape.
fn build_repair_prompt(classification: &ErrorClassification, files: &FileSet) -> String {
    let mut prompt = String::new();
    prompt.push_str("Fix this deployment error in the provided files:\n\n");
    prompt.push_str(&format!("Error Kind: {:?}\n", classification.kind));
    prompt.push_str(&format!("Error Message: {}\n", classification.message));
    if let Some(file) = &classification.file {
        prompt.push_str(&format!("Error File: {}\n", file));
    }
    if let Some(line) = classification.line {
        prompt.push_str(&format!("Error Line: {}\n", line));
    }

    prompt.push_str("\nFiles to fix:\n");
    for file in files.iter() {
        prompt.push_str(&format!("=== {} ===\n{}\n\n", file.path, file.content));
    }

    prompt.push_str(
        "Provide the corrected files that fix the deployment error. Focus on:\n\
         1. Fixing syntax errors\n\
         2. Adding missing dependencies\n\
         3. Correcting configuration issues\n\
         4. Resolving build failures\n\n\
         Return the response as JSON:\n\
         {\n\
           \"fixes\": [\n\
             {\n\
               \"path\": \"path/to/file\",\n\
               \"content\": \"corrected file content\",\n\
               \"explanation\": \"what was fixed\"\n\
             }\n\
           ],\n\
           \"suggestions\": [\"how to prevent similar errors\"]\n\
         }\n",
    );

    prompt
}

/// Best-effort extraction of the JSON payload from a model reply.
///
/// Preference order: a ```json fenced block, then the widest brace
/// span, then the reply verbatim. Returns `None` when nothing
/// deserializes into [`RepairResponse`].
fn parse_repair_reply(reply: &str) -> Option<RepairResponse> {
    let fenced = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("static regex");
    let braced = Regex::new(r"(?s)\{.*\}").expect("static regex");

    let candidate = if let Some(captures) = fenced.captures(reply) {
        captures.get(1).map(|m| m.as_str()).unwrap_or(reply)
    } else if let Some(found) = braced.find(reply) {
        found.as_str()
    } else {
        reply
    };

    serde_json::from_str(candidate).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify_error, ErrorContext};
    use crate::fakes::ScriptedModel;

    fn dependency_error() -> ErrorClassification {
        classify_error("Module not found: lodash", ErrorContext::default())
    }

    fn sample_files() -> FileSet {
        FileSet::from_files([
            SiteFile::new("index.html", "<h1>Hi</h1>"),
            SiteFile::new("app.js", "import _ from 'lodash'"),
        ])
    }

    fn fixed_payload() -> String {
        serde_json::json!({
            "fixes": [
                {"path": "package.json", "content": "{\"dependencies\":{\"lodash\":\"^4\"}}", "explanation": "declare lodash"}
            ],
            "suggestions": ["Pin dependency versions"]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_fenced_payload_is_extracted() {
        let reply = format!("Here is the fix:\n```json\n{}\n```\nGood luck!", fixed_payload());
        let oracle = RepairOracle::new(Arc::new(ScriptedModel::new([reply])));

        let proposal = oracle
            .propose_fix(&dependency_error(), &sample_files())
            .await
            .unwrap();

        assert!(proposal.revised);
        assert!(proposal.files.contains("package.json"));
        assert_eq!(proposal.files.len(), 3);
        assert_eq!(proposal.suggestions, vec!["Pin dependency versions"]);
    }

    #[tokio::test]
    async fn test_bare_json_with_prose_is_extracted() {
        let reply = format!("Sure thing. {} Hope that helps.", fixed_payload());
        let oracle = RepairOracle::new(Arc::new(ScriptedModel::new([reply])));

        let proposal = oracle
            .propose_fix(&dependency_error(), &sample_files())
            .await
            .unwrap();
        assert!(proposal.revised);
    }

    #[tokio::test]
    async fn test_unparsable_reply_keeps_files_identical() {
        let oracle = RepairOracle::new(Arc::new(ScriptedModel::new([
            "I could not produce a fix, sorry.".to_string(),
        ])));
        let files = sample_files();

        let proposal = oracle.propose_fix(&dependency_error(), &files).await.unwrap();

        assert!(!proposal.revised);
        assert_eq!(proposal.files.revision_digest(), files.revision_digest());
        assert!(proposal.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_file_name_alias_is_accepted() {
        let reply = serde_json::json!({
            "fixes": [{"fileName": "index.html", "content": "<h1>Fixed</h1>"}],
            "suggestions": []
        })
        .to_string();
        let oracle = RepairOracle::new(Arc::new(ScriptedModel::new([reply])));

        let proposal = oracle
            .propose_fix(&dependency_error(), &sample_files())
            .await
            .unwrap();
        assert_eq!(proposal.files.get("index.html"), Some("<h1>Fixed</h1>"));
    }

    #[tokio::test]
    async fn test_model_error_is_absorbed() {
        // empty queue -> ModelError from the fake
        let oracle = RepairOracle::new(Arc::new(ScriptedModel::new(Vec::<String>::new())));
        let files = sample_files();

        let proposal = oracle.propose_fix(&dependency_error(), &files).await.unwrap();
        assert!(!proposal.revised);
        assert_eq!(proposal.files, files);
    }

    #[tokio::test]
    async fn test_unavailable_model_is_surfaced() {
        let oracle = RepairOracle::new(Arc::new(ScriptedModel::unavailable()));
        let err = oracle
            .propose_fix(&dependency_error(), &sample_files())
            .await
            .unwrap_err();
        assert!(matches!(err, BerthError::ModelUnavailable));
    }

    #[tokio::test]
    async fn test_prompt_embeds_error_and_files() {
        let model = Arc::new(ScriptedModel::new([fixed_payload()]));
        let oracle = RepairOracle::new(model.clone());

        oracle
            .propose_fix(&dependency_error(), &sample_files())
            .await
            .unwrap();

        let prompts = model.recorded_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Module not found: lodash"));
        assert!(prompts[0].contains("=== index.html ==="));
        assert!(prompts[0].contains("import _ from 'lodash'"));
    }

    #[test]
    fn test_parse_prefers_fenced_block_over_outer_braces() {
        let reply = format!(
            "{{\"not\": \"this\"}}\n```json\n{}\n```",
            fixed_payload()
        );
        let response = parse_repair_reply(&reply).unwrap();
        assert_eq!(response.fixes.len(), 1);
    }

    #[test]
    fn test_parse_whole_reply_as_json() {
        let response = parse_repair_reply(&fixed_payload()).unwrap();
        assert_eq!(response.fixes[0].path, "package.json");
    }
}
