//! Dependency resolution between catalog rules.
//!
//! Two halves:
//! - at load time, `evaluation_order` rejects unknown dependencies, self
//!   dependencies and cycles, and produces a topological order;
//! - at evaluation time, `DependencyResolver` decides whether a rule's
//!   dependencies are satisfied by the scores computed so far.
//!
//! A dependency is satisfied when the depended-on rule is applicable,
//! whatever its coverage.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::catalog::{CatalogError, Rule};
use crate::types::RuleScore;

/// Topological order of `rules` (as positions), ties broken by position.
pub(crate) fn evaluation_order(
    rules: &[Rule],
    index: &HashMap<String, usize>,
) -> Result<Vec<usize>, CatalogError> {
    let mut indegree = vec![0usize; rules.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); rules.len()];

    for (position, rule) in rules.iter().enumerate() {
        for dependency in &rule.depends_on {
            if dependency == &rule.id {
                return Err(CatalogError::SelfDependency(rule.id.clone()));
            }
            let Some(&target) = index.get(dependency) else {
                return Err(CatalogError::UnknownDependency {
                    rule_id: rule.id.clone(),
                    dependency: dependency.clone(),
                });
            };
            indegree[position] += 1;
            dependents[target].push(position);
        }
    }

    // Kahn's algorithm; the ready set is ordered so the result is stable.
    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();
    let mut order = Vec::with_capacity(rules.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < rules.len() {
        let mut stuck: Vec<String> = indegree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d > 0)
            .map(|(i, _)| rules[i].id.clone())
            .collect();
        stuck.sort();
        return Err(CatalogError::DependencyCycle(stuck));
    }

    Ok(order)
}

/// Answers "may this rule be scored?" against prior results.
pub struct DependencyResolver<'a> {
    prior: &'a BTreeMap<String, RuleScore>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(prior: &'a BTreeMap<String, RuleScore>) -> Self {
        Self { prior }
    }

    /// True when every dependency of `rule` is applicable.
    pub fn resolves(&self, rule: &Rule) -> bool {
        self.unmet(rule).is_empty()
    }

    /// Dependencies that are missing or inapplicable, in id order.
    ///
    /// A dependency with no prior score counts as unmet; the catalog's
    /// evaluation order makes that unreachable for loaded catalogs.
    pub fn unmet(&self, rule: &Rule) -> Vec<String> {
        rule.depends_on
            .iter()
            .filter(|id| !self.prior.get(*id).is_some_and(|score| score.applicable))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckKind;

    fn rule(id: &str, deps: &[&str]) -> Rule {
        Rule {
            id: id.to_string(),
            category: "design".to_string(),
            max_points: 1.0,
            auto_fail: false,
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            check: CheckKind::Pagination,
            description: id.to_string(),
        }
    }

    fn index(rules: &[Rule]) -> HashMap<String, usize> {
        rules.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect()
    }

    fn score(id: &str, applicable: bool) -> RuleScore {
        RuleScore {
            rule_id: id.to_string(),
            category: "design".to_string(),
            applicable,
            targets_checked: if applicable { 1 } else { 0 },
            targets_passed: 0,
            coverage: 0.0,
            earned_points: 0.0,
            max_points: 1.0,
            inapplicable_reason: None,
        }
    }

    #[test]
    fn test_order_puts_dependencies_first() {
        let rules = vec![rule("A-001", &["B-001"]), rule("B-001", &["C-001"]), rule("C-001", &[])];
        let order = evaluation_order(&rules, &index(&rules)).unwrap();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_independent_rules_keep_file_order() {
        let rules = vec![rule("A-001", &[]), rule("B-001", &[]), rule("C-001", &["A-001"])];
        let order = evaluation_order(&rules, &index(&rules)).unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_detected() {
        let rules = vec![
            rule("A-001", &["B-001"]),
            rule("B-001", &["A-001"]),
            rule("C-001", &[]),
        ];
        let err = evaluation_order(&rules, &index(&rules)).unwrap_err();
        match err {
            CatalogError::DependencyCycle(ids) => assert_eq!(ids, vec!["A-001", "B-001"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_detected() {
        let rules = vec![rule("A-001", &["A-001"])];
        assert!(matches!(
            evaluation_order(&rules, &index(&rules)),
            Err(CatalogError::SelfDependency(_))
        ));
    }

    #[test]
    fn test_unknown_dependency_detected() {
        let rules = vec![rule("A-001", &["Z-999"])];
        assert!(matches!(
            evaluation_order(&rules, &index(&rules)),
            Err(CatalogError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_resolver_requires_applicable_dependencies() {
        let dependent = rule("A-001", &["B-001", "C-001"]);
        let mut prior = BTreeMap::new();
        prior.insert("B-001".to_string(), score("B-001", true));
        prior.insert("C-001".to_string(), score("C-001", false));

        let resolver = DependencyResolver::new(&prior);
        assert!(!resolver.resolves(&dependent));
        assert_eq!(resolver.unmet(&dependent), vec!["C-001"]);

        prior.insert("C-001".to_string(), score("C-001", true));
        let resolver = DependencyResolver::new(&prior);
        assert!(resolver.resolves(&dependent));
    }

    #[test]
    fn test_zero_coverage_dependency_still_satisfies() {
        let dependent = rule("A-001", &["B-001"]);
        let mut prior = BTreeMap::new();
        prior.insert("B-001".to_string(), score("B-001", true));
        assert!(DependencyResolver::new(&prior).resolves(&dependent));
    }
}
