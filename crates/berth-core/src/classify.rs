//! Deployment failure classification.
//!
//! Pure keyword taxonomy over raw provider error messages. Classification
//! never fails: anything that matches no known family falls back to
//! [`ErrorKind::Runtime`] with a generic hint set.

use serde::{Deserialize, Serialize};

/// Coarse failure taxonomy used by the repair loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Dependency,
    Build,
    Config,
    Runtime,
}

/// Structured location context supplied by the executor when available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl ErrorContext {
    pub fn at(file: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            file: Some(file.into()),
            line,
        }
    }
}

/// Classified failure with remediation hints, attached to an attempt record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub kind: ErrorKind,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub remediation_hints: Vec<String>,
}

fn hints(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn runtime_hints() -> Vec<String> {
    hints(&[
        "Check build logs for more details",
        "Verify all files are included",
        "Review build command and settings",
    ])
}

/// Runtime classification for failures that never reached the provider
/// as a deploy outcome (collaborator errors caught at the orchestrator
/// boundary). Skips keyword matching on purpose: the message describes
/// our own plumbing, not the user's code.
pub fn runtime_fallback(message: &str) -> ErrorClassification {
    ErrorClassification {
        kind: ErrorKind::Runtime,
        message: message.to_string(),
        file: None,
        line: None,
        remediation_hints: runtime_hints(),
    }
}

/// Classify a raw failure message into a kind plus remediation hints.
///
/// Matching is case-insensitive, in fixed priority order: dependency and
/// syntax families are checked before the environment family, and the
/// generic runtime fallback comes last. Dependency and syntax errors are
/// the most common and the most mechanically fixable, so they win ties.
pub fn classify_error(raw_message: &str, context: ErrorContext) -> ErrorClassification {
    let lower = raw_message.to_lowercase();

    let (kind, remediation_hints) = if lower.contains("module not found")
        || lower.contains("package not found")
    {
        (
            ErrorKind::Dependency,
            hints(&[
                "Add missing dependencies to the manifest",
                "Check import paths are correct",
                "Verify package names and versions",
            ]),
        )
    } else if lower.contains("syntax error") || lower.contains("unexpected token") {
        (
            ErrorKind::Build,
            hints(&[
                "Check for syntax errors in your code",
                "Verify language configuration",
                "Check for missing brackets or terminators",
            ]),
        )
    } else if lower.contains("environment") || lower.contains("env") {
        (
            ErrorKind::Config,
            hints(&[
                "Check environment variables are set",
                "Verify .env file configuration",
                "Check build environment settings",
            ]),
        )
    } else {
        (ErrorKind::Runtime, runtime_hints())
    };

    ErrorClassification {
        kind,
        message: raw_message.to_string(),
        file: context.file,
        line: context.line,
        remediation_hints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(raw: &str) -> ErrorClassification {
        classify_error(raw, ErrorContext::default())
    }

    #[test]
    fn test_module_not_found_is_dependency() {
        let c = classify("Build failed: Module not found: lodash");
        assert_eq!(c.kind, ErrorKind::Dependency);
        assert!(c.remediation_hints.iter().any(|h| h.contains("manifest")));
    }

    #[test]
    fn test_package_not_found_is_dependency() {
        let c = classify("error: package not found in registry");
        assert_eq!(c.kind, ErrorKind::Dependency);
    }

    #[test]
    fn test_syntax_error_is_build() {
        let c = classify("SyntaX Error near line 14");
        assert_eq!(c.kind, ErrorKind::Build);
    }

    #[test]
    fn test_unexpected_token_is_build() {
        let c = classify("Unexpected token '}' in app.js");
        assert_eq!(c.kind, ErrorKind::Build);
    }

    #[test]
    fn test_env_keywords_are_config() {
        assert_eq!(classify("missing ENVIRONMENT settings").kind, ErrorKind::Config);
        assert_eq!(classify("ENV var DATABASE_URL unset").kind, ErrorKind::Config);
    }

    #[test]
    fn test_unmatched_message_is_runtime_with_generic_hints() {
        let c = classify("segmentation fault during publish");
        assert_eq!(c.kind, ErrorKind::Runtime);
        assert_eq!(c.remediation_hints.len(), 3);
        assert!(c
            .remediation_hints
            .iter()
            .any(|h| h.contains("build logs")));
    }

    #[test]
    fn test_priority_dependency_beats_build() {
        // matches both the dependency and syntax families; dependency
        // is diagnosed first
        let c = classify("module not found after syntax error");
        assert_eq!(c.kind, ErrorKind::Dependency);
    }

    #[test]
    fn test_priority_build_beats_config() {
        let c = classify("syntax error in environment.js");
        assert_eq!(c.kind, ErrorKind::Build);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("MODULE NOT FOUND").kind, ErrorKind::Dependency);
        assert_eq!(classify("module not found").kind, ErrorKind::Dependency);
    }

    #[test]
    fn test_context_is_carried_through() {
        let c = classify_error(
            "Unexpected token",
            ErrorContext::at("src/app.js", Some(42)),
        );
        assert_eq!(c.file.as_deref(), Some("src/app.js"));
        assert_eq!(c.line, Some(42));
    }

    #[test]
    fn test_message_preserves_original_casing() {
        let c = classify("Module Not Found: Lodash");
        assert_eq!(c.message, "Module Not Found: Lodash");
    }

    #[test]
    fn test_runtime_fallback_ignores_keywords() {
        // a plumbing error mentioning "env" must not classify as Config
        let c = runtime_fallback("hosting provider error: env proxy refused connection");
        assert_eq!(c.kind, ErrorKind::Runtime);
        assert!(c.remediation_hints.iter().any(|h| h.contains("build logs")));
    }

    #[test]
    fn test_classification_serde_roundtrip() {
        let c = classify("module not found");
        let json = serde_json::to_string(&c).expect("serialize");
        let deserialized: ErrorClassification = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(c, deserialized);
    }
}
