//! Prerequisite gate.
//!
//! A fixed, ordered set of checks every document must pass before any rule
//! is scored. They live outside the catalog (ids in the reserved `PRE-`
//! namespace) and are never skipped.

use serde_json::Value;

use crate::checks::patterns::is_uuid;
use crate::document::{non_empty_str, SpecDocument};
use crate::types::Finding;

/// Category attached to gate findings.
pub const PREREQUISITE_CATEGORY: &str = "prerequisites";

/// One gate check.
#[derive(Debug, Clone, Copy)]
pub struct PrerequisiteCheck {
    pub id: &'static str,
    pub description: &'static str,
    pub location: &'static str,
    predicate: fn(&SpecDocument) -> bool,
}

impl PrerequisiteCheck {
    pub fn holds(&self, doc: &SpecDocument) -> bool {
        (self.predicate)(doc)
    }
}

/// The gate, in evaluation order.
pub const PREREQUISITES: [PrerequisiteCheck; 5] = [
    PrerequisiteCheck {
        id: "PRE-001",
        description: "Document declares its OpenAPI version",
        location: "/openapi",
        predicate: |doc| non_empty_str(doc.get(&["openapi"])).is_some(),
    },
    PrerequisiteCheck {
        id: "PRE-002",
        description: "Document has an info object",
        location: "/info",
        predicate: |doc| doc.object_at(&["info"]).is_some(),
    },
    PrerequisiteCheck {
        id: "PRE-003",
        description: "info.x-api-id is a UUID",
        location: "/info/x-api-id",
        predicate: |doc| doc.str_at(&["info", "x-api-id"]).is_some_and(is_uuid),
    },
    PrerequisiteCheck {
        id: "PRE-004",
        description: "info.title is not empty",
        location: "/info/title",
        predicate: |doc| non_empty_str(doc.get(&["info", "title"])).is_some(),
    },
    PrerequisiteCheck {
        id: "PRE-005",
        description: "Document has a paths object",
        location: "/paths",
        predicate: |doc| doc.get(&["paths"]).is_some_and(Value::is_object),
    },
];

/// Outcome of running the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub passed: bool,

    /// One `error` finding per failing check, in gate order
    pub failures: Vec<Finding>,
}

/// Run every prerequisite check against `doc`.
pub fn check_prerequisites(doc: &SpecDocument) -> GateOutcome {
    let failures: Vec<Finding> = PREREQUISITES
        .iter()
        .filter(|check| !check.holds(doc))
        .map(|check| {
            Finding::error(
                check.id,
                format!("Prerequisite failed: {}", check.description),
                check.location,
            )
            .with_category(PREREQUISITE_CATEGORY)
        })
        .collect();

    GateOutcome {
        passed: failures.is_empty(),
        failures,
    }
}
