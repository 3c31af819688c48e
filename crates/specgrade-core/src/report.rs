//! Flat JSON report handed to callers and persistence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Finding, GradeResult, InapplicableReason, LetterGrade, RuleScore, ScoringMode};

/// Category totals as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub earned: f64,
    pub max: f64,
    pub percentage: f64,
    pub rules_applicable: u32,
}

/// Per-rule coverage as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleScoreReport {
    pub category: String,
    pub applicable: bool,
    pub targets_checked: u32,
    pub targets_passed: u32,
    pub coverage: f64,
    pub earned: f64,
    pub max: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inapplicable_reason: Option<InapplicableReason>,
}

impl From<&RuleScore> for RuleScoreReport {
    fn from(score: &RuleScore) -> Self {
        Self {
            category: score.category.clone(),
            applicable: score.applicable,
            targets_checked: score.targets_checked,
            targets_passed: score.targets_passed,
            coverage: score.coverage,
            earned: score.earned_points,
            max: score.max_points,
            inapplicable_reason: score.inapplicable_reason.clone(),
        }
    }
}

/// The output object of one grading call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub total: f64,
    pub letter: LetterGrade,
    pub compliance_pct: f64,
    pub blocked_by_prerequisites: bool,
    pub auto_fail_triggered: bool,
    pub auto_fail_reasons: Vec<String>,
    pub critical_issues: usize,
    pub per_category: BTreeMap<String, CategoryReport>,

    /// Coverage mode only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_scores: Option<BTreeMap<String, RuleScoreReport>>,

    pub scoring_mode: ScoringMode,
    pub spec_hash: String,
    pub catalog_version: String,
    pub excellence: bool,
    pub findings: Vec<Finding>,
}

impl GradeReport {
    pub fn new(result: &GradeResult, spec_hash: impl Into<String>) -> Self {
        let per_category = result
            .breakdown
            .iter()
            .map(|c| {
                (
                    c.category.clone(),
                    CategoryReport {
                        earned: c.earned_points,
                        max: c.max_points,
                        percentage: c.percentage,
                        rules_applicable: c.rules_applicable,
                    },
                )
            })
            .collect();

        let rule_scores = (result.scoring_mode == ScoringMode::CoverageBased
            && !result.blocked_by_prerequisites)
            .then(|| {
                result
                    .rule_scores
                    .iter()
                    .map(|(id, score)| (id.clone(), RuleScoreReport::from(score)))
                    .collect()
            });

        Self {
            total: result.total_score,
            letter: result.letter_grade,
            compliance_pct: result.compliance_pct,
            blocked_by_prerequisites: result.blocked_by_prerequisites,
            auto_fail_triggered: result.auto_fail_triggered,
            auto_fail_reasons: result.auto_fail_reasons.clone(),
            critical_issues: result.critical_findings_count,
            per_category,
            rule_scores,
            scoring_mode: result.scoring_mode,
            spec_hash: spec_hash.into(),
            catalog_version: result.catalog_version.clone(),
            excellence: result.excellence,
            findings: result.findings.clone(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CategoryBreakdown;

    fn result(mode: ScoringMode) -> GradeResult {
        let mut rule_scores = BTreeMap::new();
        rule_scores.insert(
            "DOC-001".to_string(),
            RuleScore {
                rule_id: "DOC-001".to_string(),
                category: "documentation".to_string(),
                applicable: true,
                targets_checked: 10,
                targets_passed: 8,
                coverage: 0.8,
                earned_points: 8.0,
                max_points: 10.0,
                inapplicable_reason: None,
            },
        );
        GradeResult {
            total_score: 80.0,
            letter_grade: LetterGrade::BMinus,
            blocked_by_prerequisites: false,
            auto_fail_triggered: false,
            auto_fail_reasons: Vec::new(),
            critical_findings_count: 0,
            compliance_pct: 0.0,
            excellence: false,
            findings: vec![Finding::warn("DOC-001", "GET /a has no summary", "/paths/~1a/get")
                .with_category("documentation")],
            breakdown: vec![CategoryBreakdown {
                category: "documentation".to_string(),
                earned_points: 8.0,
                max_points: 10.0,
                percentage: 80.0,
                rules_applicable: 1,
            }],
            rule_scores,
            scoring_mode: mode,
            catalog_version: "2.1.0".to_string(),
        }
    }

    #[test]
    fn test_report_field_names() {
        let report = GradeReport::new(&result(ScoringMode::CoverageBased), "sha256:abc");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["total"], 80.0);
        assert_eq!(json["letter"], "B-");
        assert_eq!(json["scoringMode"], "coverage-based");
        assert_eq!(json["specHash"], "sha256:abc");
        assert_eq!(json["catalogVersion"], "2.1.0");
        assert_eq!(json["criticalIssues"], 0);
        assert_eq!(json["perCategory"]["documentation"]["percentage"], 80.0);
        assert_eq!(json["ruleScores"]["DOC-001"]["targetsPassed"], 8);
        assert_eq!(json["findings"][0]["ruleId"], "DOC-001");
        assert!(json.get("blockedByPrerequisites").is_some());
        assert!(json.get("autoFailReasons").is_some());
    }

    #[test]
    fn test_legacy_report_omits_rule_scores() {
        let report = GradeReport::new(&result(ScoringMode::Legacy), "sha256:abc");
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("ruleScores").is_none());
        assert_eq!(json["scoringMode"], "legacy");
    }
}
