//! Resource design checks: path shape, path parameters, pagination, typing.

use serde_json::Value;

use super::patterns::{
    is_kebab_segment, literal_segments, starts_with_action_verb, template_variables,
    PAGE_SIZE_PARAMETERS, PAGING_PARAMETERS,
};
use super::{collection_reads, op_label, TargetOutcome};
use crate::document::{pointer, SpecDocument};

pub(super) fn path_naming(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.path_templates()
        .into_iter()
        .map(|path| {
            let offending: Vec<&str> = literal_segments(path)
                .filter(|s| !is_kebab_segment(s))
                .collect();
            TargetOutcome::condition(pointer(&["paths", path]), offending.is_empty(), || {
                format!(
                    "Path {} has segments that are not lower kebab-case: {}",
                    path,
                    offending.join(", ")
                )
            })
        })
        .collect()
}

pub(super) fn path_verbs(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.path_templates()
        .into_iter()
        .map(|path| {
            let verb = literal_segments(path).find(|s| starts_with_action_verb(s));
            TargetOutcome::condition(pointer(&["paths", path]), verb.is_none(), || {
                format!(
                    "Path {} uses the verb segment '{}'",
                    path,
                    verb.unwrap_or_default()
                )
            })
        })
        .collect()
}

pub(super) fn path_parameters(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let mut outcomes = Vec::new();

    for op in doc.operations() {
        let params = op.parameters(doc);
        for variable in template_variables(op.path) {
            let named = params.iter().find(|p| p.name == variable && p.location == "path");
            let declared = named.is_some_and(|p| p.required);
            // Located at the declaration when there is one, else at a
            // per-placeholder slot under the operation's parameters.
            let location = named
                .map(|p| p.pointer.clone())
                .unwrap_or_else(|| op.child_pointer(&["parameters", variable]));
            outcomes.push(TargetOutcome::condition(location, declared, || {
                format!(
                    "{} does not declare {{{}}} as a required path parameter",
                    op_label(&op),
                    variable
                )
            }));
        }
    }

    outcomes
}

pub(super) fn pagination(doc: &SpecDocument) -> Vec<TargetOutcome> {
    collection_reads(doc)
        .iter()
        .map(|op| {
            let paged = op
                .parameters(doc)
                .iter()
                .any(|p| p.location == "query" && PAGING_PARAMETERS.contains(&p.name));
            TargetOutcome::condition(op.pointer(), paged, || {
                format!("{} returns a collection without paging parameters", op_label(op))
            })
        })
        .collect()
}

pub(super) fn pagination_limits(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let mut outcomes = Vec::new();

    for op in collection_reads(doc) {
        for param in op.parameters(doc) {
            if param.location != "query" || !PAGE_SIZE_PARAMETERS.contains(&param.name) {
                continue;
            }
            let bounded = param
                .node
                .get("schema")
                .map(|s| doc.resolve(s))
                .is_some_and(|s| s.get("maximum").is_some_and(Value::is_number));
            let name = param.name;
            outcomes.push(TargetOutcome::condition(param.pointer, bounded, || {
                format!("Page size parameter '{}' of {} has no maximum", name, op_label(&op))
            }));
        }
    }

    outcomes
}

pub(super) fn property_types(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let Some(schemas) = doc.object_at(&["components", "schemas"]) else {
        return Vec::new();
    };

    let mut outcomes = Vec::new();
    for (schema_name, schema) in schemas {
        let Some(properties) = doc.resolve(schema).get("properties").and_then(Value::as_object)
        else {
            continue;
        };
        for (property, node) in properties {
            outcomes.push(TargetOutcome::condition(
                pointer(&["components", "schemas", schema_name, "properties", property]),
                is_typed(node),
                || format!("Property '{}.{}' has no type", schema_name, property),
            ));
        }
    }
    outcomes
}

fn is_typed(node: &Value) -> bool {
    ["type", "$ref", "allOf", "oneOf", "anyOf"]
        .iter()
        .any(|key| node.get(*key).is_some())
}
