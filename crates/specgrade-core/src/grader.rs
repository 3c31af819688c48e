//! Aggregator & Grader: turns per-rule scores into the final result.
//!
//! Policy, fixed in code:
//! 1. Every point value is rounded once, half-up to two decimals
//! 2. The total is `100 × earned / max` over applicable rules, clamped to [0, 100]
//! 3. The letter grade is read off the rounded total
//! 4. Coverage scoring has no hard auto-fail; errors only block excellence

use std::collections::BTreeMap;

use crate::catalog::RuleCatalog;
use crate::evaluator::Evaluation;
use crate::normalize::normalize;
use crate::types::{CategoryBreakdown, Finding, GradeResult, LetterGrade, RuleScore, ScoringMode};

/// Minimum total for the excellence flag.
pub const EXCELLENCE_THRESHOLD: f64 = 90.0;

/// Round half-up to two decimal places. Inputs are non-negative.
///
/// The scaled value is first snapped to nine decimals, so a product like
/// `1.005 * 100.0 = 100.49999999999999` is treated as the half it stands for.
pub fn round_points(x: f64) -> f64 {
    let scaled = (x * 100.0 * 1e9).round() / 1e9;
    scaled.round() / 100.0
}

/// `100 × earned / max`, rounded; 0 when nothing is at stake.
pub(crate) fn percentage(earned: f64, max: f64) -> f64 {
    if max > 0.0 {
        round_points(100.0 * earned / max).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub(crate) fn is_excellent(total: f64, critical_findings: usize) -> bool {
    total >= EXCELLENCE_THRESHOLD && critical_findings == 0
}

/// Aggregates coverage-based rule scores.
pub struct Grader;

impl Grader {
    pub fn new() -> Self {
        Self
    }

    /// Build the coverage-mode result.
    ///
    /// Upstream findings are merged into the ordered finding list but do not
    /// move the score.
    pub fn finalize(
        &self,
        catalog: &RuleCatalog,
        evaluation: Evaluation,
        upstream: &[Finding],
    ) -> GradeResult {
        let Evaluation { scores, mut findings } = evaluation;

        let earned: f64 = scores.values().map(RuleScore::counted_earned).sum();
        let max: f64 = scores.values().map(RuleScore::counted_max).sum();
        let total_score = percentage(earned, max);

        findings.extend_from_slice(upstream);
        let findings = normalize(findings);
        let critical_findings_count = findings.iter().filter(|f| f.is_critical()).count();

        GradeResult {
            total_score,
            letter_grade: LetterGrade::from_score(total_score),
            blocked_by_prerequisites: false,
            auto_fail_triggered: false,
            auto_fail_reasons: Vec::new(),
            critical_findings_count,
            compliance_pct: self.compliance_pct(&scores),
            excellence: is_excellent(total_score, critical_findings_count),
            findings,
            breakdown: category_breakdown(&scores),
            rule_scores: scores,
            scoring_mode: ScoringMode::CoverageBased,
            catalog_version: catalog.version().to_string(),
        }
    }

    /// Share of applicable rules that passed every target, as a percentage.
    fn compliance_pct(&self, scores: &BTreeMap<String, RuleScore>) -> f64 {
        let applicable = scores.values().filter(|s| s.applicable).count();
        let complete = scores.values().filter(|s| s.is_fully_passing()).count();
        percentage(complete as f64, applicable as f64)
    }
}

impl Default for Grader {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-category totals over applicable rules, sorted by category.
///
/// Categories with no applicable rule are omitted.
pub(crate) fn category_breakdown(scores: &BTreeMap<String, RuleScore>) -> Vec<CategoryBreakdown> {
    let mut sums: BTreeMap<&str, (f64, f64, u32)> = BTreeMap::new();
    for score in scores.values().filter(|s| s.applicable) {
        let entry = sums.entry(score.category.as_str()).or_default();
        entry.0 += score.earned_points;
        entry.1 += score.max_points;
        entry.2 += 1;
    }

    sums.into_iter()
        .map(|(category, (earned, max, rules))| CategoryBreakdown {
            category: category.to_string(),
            earned_points: round_points(earned),
            max_points: round_points(max),
            percentage: percentage(earned, max),
            rules_applicable: rules,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InapplicableReason, Severity};

    const CATALOG: &str = r#"
catalog_version: "1.0.0"
name: Test
format: { name: OpenAPI, required: "3.x" }
rules:
  - { id: DOC-001, category: documentation, max_points: 10, check: operation_summary, description: a }
  - { id: DES-001, category: design, max_points: 6, check: pagination, description: b }
  - { id: SEC-001, category: security, max_points: 8, check: security_requirements, description: c }
"#;

    fn score(id: &str, category: &str, checked: u32, passed: u32, max: f64) -> RuleScore {
        let applicable = checked > 0;
        let coverage = if applicable {
            f64::from(passed) / f64::from(checked)
        } else {
            0.0
        };
        RuleScore {
            rule_id: id.to_string(),
            category: category.to_string(),
            applicable,
            targets_checked: checked,
            targets_passed: passed,
            coverage,
            earned_points: round_points(coverage * max),
            max_points: max,
            inapplicable_reason: (!applicable).then_some(InapplicableReason::NoTargets),
        }
    }

    fn evaluation(scores: Vec<RuleScore>) -> Evaluation {
        Evaluation {
            scores: scores.into_iter().map(|s| (s.rule_id.clone(), s)).collect(),
            findings: Vec::new(),
        }
    }

    fn catalog() -> RuleCatalog {
        RuleCatalog::from_yaml(CATALOG).unwrap()
    }

    #[test]
    fn test_round_points_half_up() {
        assert_eq!(round_points(2.125), 2.13);
        assert_eq!(round_points(8.0), 8.0);
        assert_eq!(round_points(66.666_666), 66.67);
        assert_eq!(round_points(0.004), 0.0);
    }

    #[test]
    fn test_round_points_half_up_on_inexact_binary_values() {
        assert_eq!(round_points(1.005), 1.01);
        assert_eq!(round_points(0.285), 0.29);
        assert_eq!(round_points(2.01 * 0.5), 1.01);
        assert_eq!(round_points(1.004_999), 1.0);
    }

    #[test]
    fn test_inapplicable_rules_leave_the_denominator() {
        let result = Grader::new().finalize(
            &catalog(),
            evaluation(vec![
                score("DOC-001", "documentation", 10, 8, 10.0),
                score("DES-001", "design", 0, 0, 6.0),
                score("SEC-001", "security", 2, 2, 8.0),
            ]),
            &[],
        );
        // (8 + 8) / (10 + 8)
        assert_eq!(result.total_score, 88.89);
        assert_eq!(result.letter_grade, LetterGrade::BPlus);
        assert_eq!(result.breakdown.len(), 2);
        assert!(result.breakdown.iter().all(|c| c.category != "design"));
        assert_eq!(result.compliance_pct, 50.0);
        assert!(!result.excellence);
    }

    #[test]
    fn test_nothing_applicable_scores_zero() {
        let result = Grader::new().finalize(
            &catalog(),
            evaluation(vec![score("DES-001", "design", 0, 0, 6.0)]),
            &[],
        );
        assert_eq!(result.total_score, 0.0);
        assert_eq!(result.letter_grade, LetterGrade::F);
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn test_upstream_errors_block_excellence_but_not_points() {
        let perfect = evaluation(vec![score("DOC-001", "documentation", 4, 4, 10.0)]);
        let upstream = [Finding::error("SCHEMA", "bad ref", "/paths")];

        let result = Grader::new().finalize(&catalog(), perfect, &upstream);
        assert_eq!(result.total_score, 100.0);
        assert_eq!(result.letter_grade, LetterGrade::APlus);
        assert_eq!(result.critical_findings_count, 1);
        assert!(!result.excellence);
        assert!(!result.auto_fail_triggered);
        assert_eq!(result.findings[0].severity, Severity::Error);
    }

    #[test]
    fn test_perfect_score_is_excellent() {
        let result = Grader::new().finalize(
            &catalog(),
            evaluation(vec![score("DOC-001", "documentation", 4, 4, 10.0)]),
            &[],
        );
        assert!(result.excellence);
        assert_eq!(result.compliance_pct, 100.0);
        assert_eq!(result.scoring_mode, ScoringMode::CoverageBased);
    }
}
