//! Response and request body checks.

use serde_json::Value;

use super::{media_types, op_label, status_class, TargetOutcome};
use crate::document::SpecDocument;

const PROBLEM_JSON: &str = "application/problem+json";

pub(super) fn success_response(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.operations()
        .iter()
        .map(|op| {
            let ok = op
                .responses(doc)
                .iter()
                .any(|(code, _)| status_class(code) == Some('2'));
            TargetOutcome::condition(op.pointer(), ok, || {
                format!("{} declares no 2xx response", op_label(op))
            })
        })
        .collect()
}

pub(super) fn error_responses(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.operations()
        .iter()
        .map(|op| {
            let ok = op
                .responses(doc)
                .iter()
                .any(|(code, _)| *code == "default" || status_class(code) == Some('4'));
            TargetOutcome::condition(op.pointer(), ok, || {
                format!("{} declares no 4xx or default response", op_label(op))
            })
        })
        .collect()
}

pub(super) fn response_schemas(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let mut outcomes = Vec::new();

    for op in doc.operations() {
        for (code, response) in op.responses(doc) {
            if status_class(code) != Some('2') || response.get("content").is_none() {
                continue;
            }
            let missing = media_without_schema(response);
            outcomes.push(TargetOutcome::condition(
                op.child_pointer(&["responses", code]),
                missing.is_empty(),
                || {
                    format!(
                        "{} response {} has no schema for {}",
                        op_label(&op),
                        code,
                        missing.join(", ")
                    )
                },
            ));
        }
    }

    outcomes
}

pub(super) fn problem_details(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let mut outcomes = Vec::new();

    for op in doc.operations() {
        for (code, response) in op.responses(doc) {
            if !matches!(status_class(code), Some('4' | '5')) || response.get("content").is_none()
            {
                continue;
            }
            let offers = media_types(response)
                .iter()
                .any(|(media, _)| media.eq_ignore_ascii_case(PROBLEM_JSON));
            outcomes.push(TargetOutcome::condition(
                op.child_pointer(&["responses", code]),
                offers,
                || format!("{} response {} does not offer {}", op_label(&op), code, PROBLEM_JSON),
            ));
        }
    }

    outcomes
}

pub(super) fn request_body_schema(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let mut outcomes = Vec::new();

    for op in doc.operations() {
        let Some(body) = op.node.get("requestBody").map(|b| doc.resolve(b)) else {
            continue;
        };
        let location = op.child_pointer(&["requestBody"]);
        if media_types(body).is_empty() {
            outcomes.push(TargetOutcome::fail(
                location,
                format!("{} request body declares no content", op_label(&op)),
            ));
            continue;
        }
        let missing = media_without_schema(body);
        outcomes.push(TargetOutcome::condition(location, missing.is_empty(), || {
            format!(
                "{} request body has no schema for {}",
                op_label(&op),
                missing.join(", ")
            )
        }));
    }

    outcomes
}

pub(super) fn rate_limiting(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.operations()
        .iter()
        .map(|op| {
            let declared = op.responses(doc).iter().any(|(code, _)| *code == "429");
            TargetOutcome::condition(op.pointer(), declared, || {
                format!("{} does not document 429 Too Many Requests", op_label(op))
            })
        })
        .collect()
}

fn media_without_schema(node: &Value) -> Vec<&str> {
    media_types(node)
        .into_iter()
        .filter(|(_, media)| media.get("schema").is_none())
        .map(|(name, _)| name)
        .collect()
}
