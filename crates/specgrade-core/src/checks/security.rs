//! Security checks.

use serde_json::Value;
use std::collections::BTreeMap;

use super::{op_label, TargetOutcome};
use crate::document::{pointer, SpecDocument};

pub(super) fn security_requirements(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let global = doc.get(&["security"]);

    doc.operations()
        .iter()
        .map(|op| {
            // An operation-level `security` (even `[]`) replaces the root one.
            let effective = op.node.get("security").or(global);
            let secured = effective
                .and_then(Value::as_array)
                .is_some_and(|reqs| !reqs.is_empty());
            TargetOutcome::condition(op.pointer(), secured, || {
                format!("{} has no security requirement", op_label(op))
            })
        })
        .collect()
}

pub(super) fn security_schemes(doc: &SpecDocument) -> Vec<TargetOutcome> {
    // scheme name -> first place it is referenced
    let mut referenced: BTreeMap<&str, String> = BTreeMap::new();

    collect_scheme_names(doc.get(&["security"]), "/security", &mut referenced);
    for op in doc.operations() {
        collect_scheme_names(
            op.node.get("security"),
            &op.child_pointer(&["security"]),
            &mut referenced,
        );
    }

    let defined = doc.object_at(&["components", "securitySchemes"]);
    referenced
        .into_iter()
        .map(|(name, location)| {
            let ok = defined.is_some_and(|schemes| schemes.contains_key(name));
            TargetOutcome::condition(location, ok, || {
                format!("Security scheme '{}' is not defined in components", name)
            })
        })
        .collect()
}

fn collect_scheme_names<'a>(
    security: Option<&'a Value>,
    location: &str,
    into: &mut BTreeMap<&'a str, String>,
) {
    let Some(requirements) = security.and_then(Value::as_array) else {
        return;
    };
    for requirement in requirements.iter().filter_map(Value::as_object) {
        for name in requirement.keys() {
            into.entry(name.as_str())
                .or_insert_with(|| location.to_string());
        }
    }
}

pub(super) fn https_servers(doc: &SpecDocument) -> Vec<TargetOutcome> {
    doc.array_at(&["servers"])
        .iter()
        .enumerate()
        .map(|(index, server)| {
            let url = server.get("url").and_then(Value::as_str).unwrap_or_default();
            let secure =
                url.starts_with("https://") || (url.starts_with('/') && !url.starts_with("//"));
            let index = index.to_string();
            TargetOutcome::condition(pointer(&["servers", index.as_str()]), secure, || {
                if url.is_empty() {
                    "Server has no url".to_string()
                } else {
                    format!("Server url '{}' does not use https", url)
                }
            })
        })
        .collect()
}
