//! Upstream validators.
//!
//! Validators contribute findings that are merged into the grade. They run
//! before scoring, concurrently, each under a deadline.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use specgrade_core::document::pointer;
use specgrade_core::{Finding, SpecDocument};

/// Errors a validator can report.
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Validator unavailable: {0}")]
    Unavailable(String),

    #[error("Validation failed: {0}")]
    Failed(String),
}

/// An external source of findings (schema validator, linter, ...).
#[async_trait]
pub trait DocumentValidator: Send + Sync {
    /// Stable name; failures are recorded as `UPSTREAM-<name>`.
    fn name(&self) -> &str;

    async fn validate(&self, doc: &SpecDocument) -> Result<Vec<Finding>, ValidatorError>;

    /// Deadline override; the pipeline default applies when `None`.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Reports local `$ref`s that point at nothing.
#[derive(Debug, Clone, Default)]
pub struct RefValidator;

impl RefValidator {
    pub const RULE_ID: &'static str = "REF-001";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentValidator for RefValidator {
    fn name(&self) -> &str {
        "refs"
    }

    async fn validate(&self, doc: &SpecDocument) -> Result<Vec<Finding>, ValidatorError> {
        let mut findings = Vec::new();
        let mut path = Vec::new();
        collect_dangling(doc.root(), doc.root(), &mut path, &mut findings);
        Ok(findings)
    }
}

fn collect_dangling(
    root: &Value,
    node: &Value,
    path: &mut Vec<String>,
    findings: &mut Vec<Finding>,
) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("$ref") {
                if let Some(local) = target.strip_prefix('#') {
                    if root.pointer(local).is_none() {
                        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                        findings.push(
                            Finding::error(
                                RefValidator::RULE_ID,
                                format!("Unresolved reference {}", target),
                                pointer(&segments),
                            )
                            .with_category("references"),
                        );
                    }
                }
            }
            for (key, child) in map {
                path.push(key.clone());
                collect_dangling(root, child, path, findings);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(index.to_string());
                collect_dangling(root, child, path, findings);
                path.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolved_refs_pass() {
        let doc = SpecDocument::from_value(json!({
            "paths": {"/a": {"get": {"responses": {"200": {"$ref": "#/components/responses/Ok"}}}}},
            "components": {"responses": {"Ok": {"description": "ok"}}}
        }));
        assert!(RefValidator::new().validate(&doc).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dangling_ref_reported_at_referencing_node() {
        let doc = SpecDocument::from_value(json!({
            "paths": {"/a": {"get": {"responses": {"200": {"$ref": "#/components/responses/Gone"}}}}}
        }));
        let findings = RefValidator::new().validate(&doc).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "REF-001");
        assert_eq!(findings[0].location, "/paths/~1a/get/responses/200");
        assert!(findings[0].is_critical());
    }

    #[tokio::test]
    async fn test_external_refs_are_ignored() {
        let doc = SpecDocument::from_value(json!({
            "components": {"schemas": {"A": {"$ref": "common.yaml#/Pet"}}}
        }));
        assert!(RefValidator::new().validate(&doc).await.unwrap().is_empty());
    }
}
