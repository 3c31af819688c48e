//! Documentation checks: summaries, descriptions, ids, tags, examples.

use serde_json::Value;
use std::collections::HashMap;

use super::{media_types, op_label, status_class, TargetOutcome};
use crate::document::{non_empty_str, pointer, SpecDocument};

pub(super) fn operation_summary(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.operations()
        .iter()
        .map(|op| {
            TargetOutcome::condition(op.pointer(), non_empty_str(op.node.get("summary")).is_some(), || {
                format!("{} has no summary", op_label(op))
            })
        })
        .collect()
}

pub(super) fn operation_description(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.operations()
        .iter()
        .map(|op| {
            TargetOutcome::condition(
                op.pointer(),
                non_empty_str(op.node.get("description")).is_some(),
                || format!("{} has no description", op_label(op)),
            )
        })
        .collect()
}

pub(super) fn operation_id(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let operations = doc.operations();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for op in &operations {
        if let Some(id) = non_empty_str(op.node.get("operationId")) {
            *seen.entry(id).or_default() += 1;
        }
    }

    operations
        .iter()
        .map(|op| match non_empty_str(op.node.get("operationId")) {
            None => TargetOutcome::fail(
                op.pointer(),
                format!("{} has no operationId", op_label(op)),
            ),
            Some(id) if seen.get(id).copied().unwrap_or(0) > 1 => TargetOutcome::fail(
                op.child_pointer(&["operationId"]),
                format!("operationId '{}' of {} is not unique", id, op_label(op)),
            ),
            Some(_) => TargetOutcome::pass(op.pointer()),
        })
        .collect()
}

pub(super) fn operation_tags(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.operations()
        .iter()
        .map(|op| {
            let tagged = op
                .node
                .get("tags")
                .and_then(Value::as_array)
                .is_some_and(|tags| !tags.is_empty());
            TargetOutcome::condition(op.pointer(), tagged, || {
                format!("{} has no tags", op_label(op))
            })
        })
        .collect()
}

pub(super) fn schema_descriptions(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let Some(schemas) = doc.object_at(&["components", "schemas"]) else {
        return Vec::new();
    };

    schemas
        .iter()
        .map(|(name, schema)| {
            let schema = doc.resolve(schema);
            TargetOutcome::condition(
                pointer(&["components", "schemas", name]),
                non_empty_str(schema.get("description")).is_some(),
                || format!("Schema '{}' has no description", name),
            )
        })
        .collect()
}

pub(super) fn response_examples(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let mut outcomes = Vec::new();

    for op in doc.operations() {
        for (code, response) in op.responses(doc) {
            if status_class(code) != Some('2') {
                continue;
            }
            for (media, node) in media_types(response) {
                let Some(schema) = node.get("schema") else {
                    continue;
                };
                let schema = doc.resolve(schema);
                let documented = has_example(node) || has_example(schema);
                outcomes.push(TargetOutcome::condition(
                    op.child_pointer(&["responses", code, "content", media]),
                    documented,
                    || format!("{} response {} ({}) has no example", op_label(&op), code, media),
                ));
            }
        }
    }

    outcomes
}

fn has_example(node: &Value) -> bool {
    node.get("example").is_some()
        || node
            .get("examples")
            .is_some_and(|e| e.as_object().map_or(true, |o| !o.is_empty()))
}
