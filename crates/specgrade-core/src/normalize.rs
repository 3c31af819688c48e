//! Finding normalizer.
//!
//! Orders findings by severity rank, category (uncategorized first), rule
//! id, location, line and message. Two lists holding the same findings in
//! any order normalize to the same list.

use std::cmp::Ordering;

use crate::types::Finding;

/// Total order over findings.
pub fn compare(a: &Finding, b: &Finding) -> Ordering {
    a.severity
        .rank()
        .cmp(&b.severity.rank())
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.rule_id.cmp(&b.rule_id))
        .then_with(|| a.location.cmp(&b.location))
        .then_with(|| a.line.unwrap_or(0).cmp(&b.line.unwrap_or(0)))
        .then_with(|| a.message.cmp(&b.message))
        // `None` and `Some(0)` only differ here
        .then_with(|| a.line.cmp(&b.line))
}

/// Sort `findings` into their canonical order.
pub fn normalize(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(compare);
    findings
}
