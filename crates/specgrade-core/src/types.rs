//! Value types shared by every stage of the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How serious a finding is.
///
/// The declaration order is the sort order used by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl Severity {
    /// Sort rank: error=0, warn=1, info=2.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warn => 1,
            Severity::Info => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
        };
        f.pad(s)
    }
}

/// A single reported issue.
///
/// Produced by the prerequisite gate, the rule evaluator, or an upstream
/// validator. Findings are plain values; nothing mutates them after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Catalog rule id, prerequisite id, or upstream validator id
    pub rule_id: String,

    pub severity: Severity,

    pub message: String,

    /// JSON Pointer into the document (e.g. "/paths/~1pets/get")
    pub location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            location: location.into(),
            category: None,
            line: None,
        }
    }

    /// Shorthand for an `error` finding.
    pub fn error(
        rule_id: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::new(rule_id, Severity::Error, message, location)
    }

    /// Shorthand for a `warn` finding.
    pub fn warn(
        rule_id: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::new(rule_id, Severity::Warn, message, location)
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Which scoring generation produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ScoringMode {
    /// Binary per-rule scoring with hard auto-fail
    #[serde(rename = "legacy")]
    Legacy,

    /// Partial credit, dependency-aware scoring
    #[default]
    #[serde(rename = "coverage-based")]
    CoverageBased,
}

impl ScoringMode {
    pub fn from_legacy_flag(legacy_mode: bool) -> Self {
        if legacy_mode {
            ScoringMode::Legacy
        } else {
            ScoringMode::CoverageBased
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMode::Legacy => "legacy",
            ScoringMode::CoverageBased => "coverage-based",
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Letter grade derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

/// Inclusive lower bounds, highest first.
const GRADE_BREAKPOINTS: [(f64, LetterGrade); 8] = [
    (97.0, LetterGrade::APlus),
    (93.0, LetterGrade::A),
    (90.0, LetterGrade::AMinus),
    (87.0, LetterGrade::BPlus),
    (83.0, LetterGrade::B),
    (80.0, LetterGrade::BMinus),
    (70.0, LetterGrade::C),
    (60.0, LetterGrade::D),
];

impl LetterGrade {
    /// Map a (already rounded) score onto the fixed breakpoints.
    pub fn from_score(score: f64) -> Self {
        GRADE_BREAKPOINTS
            .iter()
            .find(|(floor, _)| score >= *floor)
            .map(|(_, grade)| *grade)
            .unwrap_or(LetterGrade::F)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Why a rule did not count toward the totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InapplicableReason {
    /// The document has nothing this rule addresses
    NoTargets,

    /// One or more dependencies were not applicable
    UnmetDependencies { rules: Vec<String> },
}

/// Per-rule scoring outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleScore {
    pub rule_id: String,
    pub category: String,
    pub applicable: bool,
    pub targets_checked: u32,
    pub targets_passed: u32,
    pub coverage: f64,
    pub earned_points: f64,
    pub max_points: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inapplicable_reason: Option<InapplicableReason>,
}

impl RuleScore {
    /// Points this rule contributes to the denominator.
    pub fn counted_max(&self) -> f64 {
        if self.applicable {
            self.max_points
        } else {
            0.0
        }
    }

    /// Points this rule contributes to the numerator.
    pub fn counted_earned(&self) -> f64 {
        if self.applicable {
            self.earned_points
        } else {
            0.0
        }
    }

    pub fn is_fully_passing(&self) -> bool {
        self.applicable && self.targets_passed == self.targets_checked
    }
}

/// Earned/max points summed over one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub earned_points: f64,
    pub max_points: f64,
    pub percentage: f64,
    pub rules_applicable: u32,
}

/// The outcome of one grading call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub total_score: f64,
    pub letter_grade: LetterGrade,
    pub blocked_by_prerequisites: bool,

    /// Only ever set in legacy mode
    pub auto_fail_triggered: bool,
    pub auto_fail_reasons: Vec<String>,

    pub critical_findings_count: usize,
    pub compliance_pct: f64,
    pub excellence: bool,
    pub findings: Vec<Finding>,
    pub breakdown: Vec<CategoryBreakdown>,

    /// Empty in legacy mode
    pub rule_scores: BTreeMap<String, RuleScore>,
    pub scoring_mode: ScoringMode,
    pub catalog_version: String,
}

impl GradeResult {
    /// Result for a document that never reached rule scoring.
    pub(crate) fn blocked(
        findings: Vec<Finding>,
        scoring_mode: ScoringMode,
        catalog_version: impl Into<String>,
    ) -> Self {
        let critical_findings_count = findings.iter().filter(|f| f.is_critical()).count();
        Self {
            total_score: 0.0,
            letter_grade: LetterGrade::F,
            blocked_by_prerequisites: true,
            auto_fail_triggered: false,
            auto_fail_reasons: Vec::new(),
            critical_findings_count,
            compliance_pct: 0.0,
            excellence: false,
            findings,
            breakdown: Vec::new(),
            rule_scores: BTreeMap::new(),
            scoring_mode,
            catalog_version: catalog_version.into(),
        }
    }
}
