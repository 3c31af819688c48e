//! # specgrade-core
//!
//! Deterministic compliance scoring for OpenAPI documents.
//!
//! This crate grades a parsed API description against a versioned rule
//! catalog and answers:
//! - Is the document well-formed enough to grade at all?
//! - How much of what each rule asks for does it provide?
//! - Which findings justify the score?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same document and catalog always produce the same result
//! 2. **Pure**: No I/O during grading; loaders live outside the engine
//! 3. **Traceable**: Every lost point is backed by a finding with a location
//! 4. **Two generations**: Legacy binary scoring and coverage-based scoring
//!    share one catalog and one gate
//!
//! ## Example
//!
//! ```rust,ignore
//! use specgrade_core::{grade, RuleCatalog, ScoringMode, SpecDocument};
//!
//! let catalog = RuleCatalog::builtin()?;
//! let doc = SpecDocument::from_file("openapi.yaml")?;
//! let result = grade(&doc, &catalog, ScoringMode::CoverageBased, &[]);
//!
//! println!("{} ({})", result.total_score, result.letter_grade);
//! for finding in &result.findings {
//!     println!("{} {} {}", finding.severity, finding.rule_id, finding.location);
//! }
//! ```

pub mod catalog;
pub mod checks;
pub mod dependency;
pub mod document;
pub mod evaluator;
pub mod gate;
pub mod grader;
pub mod hash;
pub mod legacy;
pub mod normalize;
pub mod report;
pub mod types;

// Re-export main types at crate root
pub use catalog::{CatalogError, FormatRequirement, Rule, RuleCatalog};
pub use checks::{CheckKind, TargetOutcome};
pub use dependency::DependencyResolver;
pub use document::{DocumentError, SpecDocument};
pub use evaluator::{evaluate, Evaluation};
pub use gate::{check_prerequisites, GateOutcome, PrerequisiteCheck, PREREQUISITES};
pub use grader::{round_points, Grader, EXCELLENCE_THRESHOLD};
pub use hash::{normalize_source, spec_hash};
pub use legacy::finalize_legacy;
pub use normalize::normalize;
pub use report::GradeReport;
pub use types::{
    CategoryBreakdown, Finding, GradeResult, InapplicableReason, LetterGrade, RuleScore,
    ScoringMode, Severity,
};

use tracing::info;

/// Grade a document.
///
/// This is the main entry point for the engine.
///
/// # Arguments
///
/// * `doc` - The parsed document
/// * `catalog` - The rule catalog to grade against
/// * `mode` - Which scoring generation to run
/// * `upstream` - Findings from external validators, merged into the result
///
/// Documents that fail the prerequisite gate come back blocked with a zero
/// score and exactly the gate's findings.
pub fn grade(
    doc: &SpecDocument,
    catalog: &RuleCatalog,
    mode: ScoringMode,
    upstream: &[Finding],
) -> GradeResult {
    let result = match mode {
        ScoringMode::Legacy => finalize_legacy(doc, catalog, upstream),
        ScoringMode::CoverageBased => {
            let gate = check_prerequisites(doc);
            if gate.passed {
                Grader::new().finalize(catalog, evaluate(doc, catalog), upstream)
            } else {
                GradeResult::blocked(gate.failures, mode, catalog.version())
            }
        }
    };

    info!(
        mode = %mode,
        total = result.total_score,
        grade = %result.letter_grade,
        findings = result.findings.len(),
        blocked = result.blocked_by_prerequisites,
        "Document graded"
    );
    result
}

/// `grade` with the boolean mode flag used by older callers.
pub fn grade_with_flag(
    doc: &SpecDocument,
    catalog: &RuleCatalog,
    legacy_mode: bool,
    upstream: &[Finding],
) -> GradeResult {
    grade(doc, catalog, ScoringMode::from_legacy_flag(legacy_mode), upstream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixtures::exemplary;

    fn builtin() -> RuleCatalog {
        RuleCatalog::builtin().unwrap()
    }

    #[test]
    fn test_exemplary_document_coverage_mode() {
        let result = grade(
            &SpecDocument::from_value(exemplary()),
            &builtin(),
            ScoringMode::CoverageBased,
            &[],
        );
        assert_eq!(result.total_score, 100.0);
        assert_eq!(result.letter_grade, LetterGrade::APlus);
        assert!(result.excellence);
        assert!(result.findings.is_empty());
        assert_eq!(result.catalog_version, "2.1.0");
        // No operation takes a request body.
        assert!(!result.rule_scores["RSP-005"].applicable);
    }

    #[test]
    fn test_gate_failure_blocks_coverage_mode() {
        let mut value = exemplary();
        value["info"].as_object_mut().unwrap().remove("x-api-id");
        let upstream = [Finding::warn("LINT", "style", "/")];

        let result = grade(
            &SpecDocument::from_value(value),
            &builtin(),
            ScoringMode::CoverageBased,
            &upstream,
        );
        assert!(result.blocked_by_prerequisites);
        assert_eq!(result.total_score, 0.0);
        assert_eq!(result.letter_grade, LetterGrade::F);
        assert!(result.rule_scores.is_empty());
        assert!(result.breakdown.is_empty());
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].rule_id, "PRE-003");
    }

    #[test]
    fn test_missing_security_is_not_auto_fail_in_coverage_mode() {
        let mut value = exemplary();
        value.as_object_mut().unwrap().remove("security");

        let result = grade(
            &SpecDocument::from_value(value),
            &builtin(),
            ScoringMode::CoverageBased,
            &[],
        );
        assert!(!result.auto_fail_triggered);
        // SEC-001 earns nothing, SEC-002 has no referenced schemes.
        assert_eq!(result.rule_scores["SEC-001"].earned_points, 0.0);
        assert!(!result.rule_scores["SEC-002"].applicable);
        assert_eq!(result.critical_findings_count, 2);
        assert!(!result.excellence);
        assert!(result.total_score > 59.0);
    }

    #[test]
    fn test_modes_diverge_on_auto_fail() {
        let mut value = exemplary();
        value.as_object_mut().unwrap().remove("security");
        let doc = SpecDocument::from_value(value);

        let legacy = grade_with_flag(&doc, &builtin(), true, &[]);
        let coverage = grade_with_flag(&doc, &builtin(), false, &[]);
        assert_eq!(legacy.letter_grade, LetterGrade::F);
        assert_ne!(coverage.letter_grade, LetterGrade::F);
    }

    #[test]
    fn test_json_and_yaml_inputs_grade_identically() {
        let json_doc = SpecDocument::from_value(exemplary());
        let yaml = serde_yaml::to_string(&exemplary()).unwrap();
        let yaml_doc = SpecDocument::from_yaml(&yaml).unwrap();

        let a = grade(&json_doc, &builtin(), ScoringMode::CoverageBased, &[]);
        let b = grade(&yaml_doc, &builtin(), ScoringMode::CoverageBased, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_upstream_findings_are_merged_in_order() {
        let doc = SpecDocument::from_value(exemplary());
        let upstream = [
            Finding::new("SPELL", Severity::Info, "typo", "/info/title"),
            Finding::warn("LINT", "style", "/paths"),
        ];
        let result = grade(&doc, &builtin(), ScoringMode::CoverageBased, &upstream);
        assert_eq!(result.total_score, 100.0);
        let ids: Vec<&str> = result.findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["LINT", "SPELL"]);
    }
}
