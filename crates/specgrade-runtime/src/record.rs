//! Run records handed to persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use specgrade_core::{GradeReport, ScoringMode, Severity};

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One graded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// `RUN:<timestamp>:<hash prefix>:<sequence>`
    pub run_id: String,
    pub graded_at: DateTime<Utc>,
    pub spec_hash: String,
    pub scoring_mode: ScoringMode,
    pub catalog_version: String,
    pub report: GradeReport,
}

/// Per-category row of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow {
    pub run_id: String,
    pub category: String,
    pub earned: f64,
    pub max: f64,
    pub percentage: f64,
}

/// Per-finding row of a run, in report order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingRow {
    pub run_id: String,
    pub ordinal: usize,
    pub rule_id: String,
    pub severity: Severity,
    pub location: String,
    pub message: String,
}

impl RunRecord {
    pub fn new(report: GradeReport, graded_at: DateTime<Utc>) -> Self {
        let run_id = next_run_id(&graded_at, &report.spec_hash);
        Self {
            run_id,
            graded_at,
            spec_hash: report.spec_hash.clone(),
            scoring_mode: report.scoring_mode,
            catalog_version: report.catalog_version.clone(),
            report,
        }
    }

    pub fn category_rows(&self) -> Vec<CategoryRow> {
        self.report
            .per_category
            .iter()
            .map(|(category, totals)| CategoryRow {
                run_id: self.run_id.clone(),
                category: category.clone(),
                earned: totals.earned,
                max: totals.max,
                percentage: totals.percentage,
            })
            .collect()
    }

    pub fn finding_rows(&self) -> Vec<FindingRow> {
        self.report
            .findings
            .iter()
            .enumerate()
            .map(|(ordinal, finding)| FindingRow {
                run_id: self.run_id.clone(),
                ordinal,
                rule_id: finding.rule_id.clone(),
                severity: finding.severity,
                location: finding.location.clone(),
                message: finding.message.clone(),
            })
            .collect()
    }
}

fn next_run_id(graded_at: &DateTime<Utc>, spec_hash: &str) -> String {
    let seq = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let digest = spec_hash.strip_prefix("sha256:").unwrap_or(spec_hash);
    let prefix: String = digest.chars().take(12).collect();
    format!(
        "RUN:{}:{}:{}",
        graded_at.format("%Y%m%dT%H%M%S%.3fZ"),
        prefix,
        seq
    )
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        let report = fixtures::report();
        let now = Utc::now();
        let a = RunRecord::new(report.clone(), now);
        let b = RunRecord::new(report, now);
        assert_ne!(a.run_id, b.run_id);
        assert!(a.run_id.starts_with("RUN:"));
        assert_eq!(a.run_id.split(':').nth(2).unwrap().len(), 12);
    }

    #[test]
    fn test_rows_follow_report() {
        let record = fixtures::record();
        let categories = record.category_rows();
        let findings = record.finding_rows();

        assert_eq!(categories.len(), record.report.per_category.len());
        assert_eq!(findings.len(), record.report.findings.len());
        assert!(findings.iter().all(|row| row.run_id == record.run_id));
        assert!(findings.iter().enumerate().all(|(i, row)| row.ordinal == i));
        assert!(findings.iter().any(|row| row.rule_id == "LINT"));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(fixtures::record()).unwrap();
        assert!(json.get("runId").is_some());
        assert!(json.get("gradedAt").is_some());
        assert_eq!(json["scoringMode"], "coverage-based");
        assert_eq!(json["catalogVersion"], "2.1.0");
    }
}
