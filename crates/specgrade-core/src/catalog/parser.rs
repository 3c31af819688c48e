//! Rule catalog parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_catalog_schema;
use crate::checks::CheckKind;
use crate::dependency;
use crate::hash::canonical_json_hash;

/// Id prefixes owned by the prerequisite gate and the legacy format check.
pub const RESERVED_ID_PREFIXES: [&str; 2] = ["PRE-", "OAS-"];

/// Embedded default rule set.
const BUILTIN_CATALOG_YAML: &str = include_str!("../../catalogs/default.yaml");

/// Errors that can occur when loading a catalog.
///
/// All of these are configuration errors: they abort startup or reload and
/// never surface during an evaluation.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Catalog schema validation failed: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Duplicate rule ID: {0}")]
    DuplicateRuleId(String),

    #[error("Rule ID {0} uses a reserved prefix")]
    ReservedRuleId(String),

    #[error("Rule {rule_id} has invalid max_points {points}")]
    InvalidPoints { rule_id: String, points: f64 },

    #[error("Rule {rule_id} depends on unknown rule {dependency}")]
    UnknownDependency { rule_id: String, dependency: String },

    #[error("Rule {0} depends on itself")]
    SelfDependency(String),

    #[error("Dependency cycle among rules: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

/// A single weighted compliance rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    /// Unique identifier (e.g., "DOC-001")
    pub id: String,

    /// Aggregation bucket (e.g., "documentation")
    pub category: String,

    /// Weight; always > 0
    pub max_points: f64,

    /// A violation fails the whole grade in legacy mode
    #[serde(default)]
    pub auto_fail: bool,

    /// Rules that must be applicable before this one is scored
    #[serde(default)]
    pub depends_on: BTreeSet<String>,

    /// Target selector and condition
    pub check: CheckKind,

    pub description: String,
}

/// Which document format and version the catalog grades.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatRequirement {
    /// Human name (e.g., "OpenAPI")
    pub name: String,

    /// Version pattern; `x` components are wildcards (e.g., "3.x", "3.0.x")
    pub required: String,
}

impl FormatRequirement {
    /// Whether a declared document version satisfies the pattern.
    pub fn accepts(&self, version: &str) -> bool {
        let declared: Vec<&str> = version.trim().split('.').collect();
        self.required
            .split('.')
            .enumerate()
            .all(|(i, wanted)| match wanted {
                "x" | "X" | "*" => true,
                exact => declared.get(i).is_some_and(|got| *got == exact),
            })
    }

    /// Reason recorded when a document's version is not accepted.
    pub fn failure_reason(&self) -> String {
        format!("{} version not {}", self.name, self.required)
    }
}

/// On-disk shape of a catalog.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    catalog_version: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    format: FormatRequirement,
    rules: Vec<Rule>,
}

/// An immutable, versioned rule catalog.
///
/// Rules keep their file order; `evaluation_order` is a topological order of
/// the dependency graph that falls back to file order between independent
/// rules.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    version: String,
    name: String,
    description: Option<String>,
    format: FormatRequirement,
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    order: Vec<usize>,
    content_hash: String,
}

impl RuleCatalog {
    /// Parse a catalog from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a catalog from a file, picking the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// The rule set shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_CATALOG_YAML)
    }

    /// Build from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CatalogError> {
        validate_catalog_schema(&value).map_err(CatalogError::SchemaViolation)?;

        let content_hash = canonical_json_hash(&value);
        let file: CatalogFile = serde_json::from_value(value)?;

        let index = Self::validate_rules(&file.rules)?;
        let order = dependency::evaluation_order(&file.rules, &index)?;

        tracing::debug!(
            catalog = %file.name,
            version = %file.catalog_version,
            rules = file.rules.len(),
            "Loaded rule catalog"
        );

        Ok(Self {
            version: file.catalog_version,
            name: file.name,
            description: file.description,
            format: file.format,
            rules: file.rules,
            index,
            order,
            content_hash,
        })
    }

    /// Check ids and weights; returns the id → position index.
    fn validate_rules(rules: &[Rule]) -> Result<HashMap<String, usize>, CatalogError> {
        let mut index = HashMap::with_capacity(rules.len());

        for (position, rule) in rules.iter().enumerate() {
            if RESERVED_ID_PREFIXES.iter().any(|p| rule.id.starts_with(p)) {
                return Err(CatalogError::ReservedRuleId(rule.id.clone()));
            }

            if !rule.max_points.is_finite() || rule.max_points <= 0.0 {
                return Err(CatalogError::InvalidPoints {
                    rule_id: rule.id.clone(),
                    points: rule.max_points,
                });
            }

            if index.insert(rule.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateRuleId(rule.id.clone()));
            }
        }

        Ok(index)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn format(&self) -> &FormatRequirement {
        &self.format
    }

    /// `sha256:` digest of the catalog's canonical JSON form.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Version plus a short content digest, e.g. `2.1.0+3f9a1c2b7d4e`.
    pub fn version_label(&self) -> String {
        let digest = self
            .content_hash
            .strip_prefix("sha256:")
            .unwrap_or(&self.content_hash);
        format!("{}+{}", self.version, &digest[..digest.len().min(12)])
    }

    /// Rules in file order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    /// Rules in dependency order: every rule comes after its dependencies.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.order.iter().map(move |&i| &self.rules[i])
    }

    pub fn categories(&self) -> BTreeSet<&str> {
        self.rules.iter().map(|r| r.category.as_str()).collect()
    }

    pub fn total_points(&self) -> f64 {
        self.rules.iter().map(|r| r.max_points).sum()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
