//! Rule evaluator.
//!
//! Walks the catalog in dependency order and turns each rule's check
//! outcomes into a `RuleScore` plus one finding per failing target.

use std::collections::BTreeMap;
use tracing::debug;

use crate::catalog::{Rule, RuleCatalog};
use crate::dependency::DependencyResolver;
use crate::document::SpecDocument;
use crate::grader::round_points;
use crate::types::{Finding, InapplicableReason, RuleScore, Severity};

/// Scores and findings for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub scores: BTreeMap<String, RuleScore>,
    pub findings: Vec<Finding>,
}

/// Evaluate every catalog rule against `doc`.
///
/// The document must already have passed the prerequisite gate.
pub fn evaluate(doc: &SpecDocument, catalog: &RuleCatalog) -> Evaluation {
    let mut evaluation = Evaluation::default();

    for rule in catalog.evaluation_order() {
        let unmet = DependencyResolver::new(&evaluation.scores).unmet(rule);
        let score = if unmet.is_empty() {
            score_rule(doc, rule, &mut evaluation.findings)
        } else {
            inapplicable(rule, InapplicableReason::UnmetDependencies { rules: unmet })
        };

        debug!(
            rule_id = %rule.id,
            applicable = score.applicable,
            checked = score.targets_checked,
            passed = score.targets_passed,
            earned = score.earned_points,
            "Rule scored"
        );
        evaluation.scores.insert(rule.id.clone(), score);
    }

    evaluation
}

fn score_rule(doc: &SpecDocument, rule: &Rule, findings: &mut Vec<Finding>) -> RuleScore {
    let outcomes = rule.check.inspect(doc);
    if outcomes.is_empty() {
        return inapplicable(rule, InapplicableReason::NoTargets);
    }

    let severity = if rule.auto_fail {
        Severity::Error
    } else {
        Severity::Warn
    };

    let mut passed = 0u32;
    for outcome in &outcomes {
        match &outcome.failure {
            None => passed += 1,
            Some(message) => findings.push(
                Finding::new(rule.id.clone(), severity, message.clone(), outcome.location.clone())
                    .with_category(rule.category.clone()),
            ),
        }
    }

    let checked = outcomes.len() as u32;
    let coverage = f64::from(passed) / f64::from(checked);
    RuleScore {
        rule_id: rule.id.clone(),
        category: rule.category.clone(),
        applicable: true,
        targets_checked: checked,
        targets_passed: passed,
        coverage,
        earned_points: round_points(coverage * rule.max_points),
        max_points: rule.max_points,
        inapplicable_reason: None,
    }
}

fn inapplicable(rule: &Rule, reason: InapplicableReason) -> RuleScore {
    RuleScore {
        rule_id: rule.id.clone(),
        category: rule.category.clone(),
        applicable: false,
        targets_checked: 0,
        targets_passed: 0,
        coverage: 0.0,
        earned_points: 0.0,
        max_points: rule.max_points,
        inapplicable_reason: Some(reason),
    }
}
