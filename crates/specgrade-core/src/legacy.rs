//! Legacy compatibility shim.
//!
//! Reproduces the first scoring generation on top of the shared catalog,
//! checks, gate and normalizer:
//! - the format version check (`OAS-STRUCT`) runs before the gate and
//!   short-circuits with a zero score
//! - every rule is binary: full points when no finding carries its id
//! - a finding on an `auto_fail` rule caps the total at 59 and forces F
//!
//! Dependencies between rules are ignored in this mode.

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::catalog::RuleCatalog;
use crate::document::SpecDocument;
use crate::gate::check_prerequisites;
use crate::grader::{is_excellent, percentage, round_points};
use crate::normalize::normalize;
use crate::types::{
    CategoryBreakdown, Finding, GradeResult, LetterGrade, ScoringMode, Severity,
};

/// Rule id of the inline format version check.
pub const FORMAT_CHECK_ID: &str = "OAS-STRUCT";

/// Highest total a legacy result can keep once auto-fail triggers.
pub const AUTO_FAIL_CAP: f64 = 59.0;

/// Grade `doc` the legacy way.
pub fn finalize_legacy(
    doc: &SpecDocument,
    catalog: &RuleCatalog,
    upstream: &[Finding],
) -> GradeResult {
    if let Some(failure) = format_check(doc, catalog) {
        debug!(reason = %failure.message, "Legacy format check failed");
        let reason = failure.message.clone();
        let mut result =
            GradeResult::blocked(vec![failure], ScoringMode::Legacy, catalog.version());
        result.auto_fail_triggered = true;
        result.auto_fail_reasons = vec![reason];
        return result;
    }

    let gate = check_prerequisites(doc);
    if !gate.passed {
        return GradeResult::blocked(gate.failures, ScoringMode::Legacy, catalog.version());
    }

    let mut findings = Vec::new();
    for rule in catalog.rules() {
        let severity = if rule.auto_fail {
            Severity::Error
        } else {
            Severity::Warn
        };
        for outcome in rule.check.inspect(doc) {
            if let Some(message) = outcome.failure {
                findings.push(
                    Finding::new(rule.id.clone(), severity, message, outcome.location)
                        .with_category(rule.category.clone()),
                );
            }
        }
    }
    findings.extend_from_slice(upstream);

    let violated: HashSet<&str> = findings.iter().map(|f| f.rule_id.as_str()).collect();

    let mut earned_total = 0.0;
    let mut clean_rules = 0usize;
    let mut categories: BTreeMap<&str, (f64, f64, u32)> = BTreeMap::new();
    let mut auto_fail_reasons = Vec::new();

    for rule in catalog.rules() {
        let failed = violated.contains(rule.id.as_str());
        let earned = if failed { 0.0 } else { rule.max_points };
        debug!(rule_id = %rule.id, failed, earned, "Legacy rule scored");

        earned_total += earned;
        if !failed {
            clean_rules += 1;
        }

        let entry = categories.entry(rule.category.as_str()).or_default();
        entry.0 += earned;
        entry.1 += rule.max_points;
        entry.2 += 1;

        if failed && rule.auto_fail {
            auto_fail_reasons.push(rule.description.clone());
        }
    }

    let auto_fail_triggered = !auto_fail_reasons.is_empty();
    let mut total_score = round_points(earned_total).clamp(0.0, 100.0);
    let letter_grade = if auto_fail_triggered {
        total_score = total_score.min(AUTO_FAIL_CAP);
        LetterGrade::F
    } else {
        LetterGrade::from_score(total_score)
    };

    let findings = normalize(findings);
    let critical_findings_count = findings.iter().filter(|f| f.is_critical()).count();

    GradeResult {
        total_score,
        letter_grade,
        blocked_by_prerequisites: false,
        auto_fail_triggered,
        auto_fail_reasons,
        critical_findings_count,
        compliance_pct: percentage(clean_rules as f64, catalog.len() as f64),
        excellence: !auto_fail_triggered && is_excellent(total_score, critical_findings_count),
        findings,
        breakdown: categories
            .into_iter()
            .map(|(category, (earned, max, rules))| CategoryBreakdown {
                category: category.to_string(),
                earned_points: round_points(earned),
                max_points: round_points(max),
                percentage: percentage(earned, max),
                rules_applicable: rules,
            })
            .collect(),
        rule_scores: BTreeMap::new(),
        scoring_mode: ScoringMode::Legacy,
        catalog_version: catalog.version().to_string(),
    }
}

/// The declared format version must satisfy the catalog's requirement.
fn format_check(doc: &SpecDocument, catalog: &RuleCatalog) -> Option<Finding> {
    let format = catalog.format();
    let accepted = doc
        .str_at(&["openapi"])
        .is_some_and(|version| format.accepts(version));
    (!accepted).then(|| {
        Finding::error(FORMAT_CHECK_ID, format.failure_reason(), "/openapi")
            .with_category("structure")
    })
}
