//! Read-only view over a parsed API description document.
//!
//! The engine never parses raw text on its own; callers hand it a
//! `SpecDocument` built by one of the loaders below. Every accessor returns
//! `Option` or an empty slice, so a missing section is an ordinary value and
//! never a panic.

use serde_json::{Map, Number, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// HTTP methods recognised as operations on a path item, in traversal order.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Upper bound on `$ref` hops, guards against reference loops.
const MAX_REF_HOPS: usize = 8;

/// Errors raised while loading a document (outside the engine).
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A parsed API description.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    root: Value,
}

impl SpecDocument {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(Self::from_value(serde_json::from_str(json)?))
    }

    /// Parse a YAML document.
    ///
    /// Non-string mapping keys (e.g. unquoted `200:` response codes) are
    /// converted to their string form.
    pub fn from_yaml(yaml: &str) -> Result<Self, DocumentError> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        Ok(Self::from_value(yaml_to_json(value)))
    }

    /// Parse either format, picking JSON when the text starts with `{`.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        if text.trim_start().starts_with('{') {
            Self::from_json(text)
        } else {
            Self::from_yaml(text)
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Walk object keys from the root.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.root, |node, key| node.get(*key))
    }

    pub fn str_at(&self, path: &[&str]) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn object_at(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        self.get(path).and_then(Value::as_object)
    }

    /// Array at `path`, or an empty slice when absent or not an array.
    pub fn array_at(&self, path: &[&str]) -> &[Value] {
        self.get(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Follow local `$ref`s (`#/...`) until a concrete node is reached.
    ///
    /// Unresolvable or external references return the `$ref` node itself.
    pub fn resolve<'a>(&'a self, node: &'a Value) -> &'a Value {
        let mut current = node;
        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return current;
            };
            let Some(pointer) = reference.strip_prefix('#') else {
                return current;
            };
            match self.root.pointer(pointer) {
                Some(target) => current = target,
                None => return current,
            }
        }
        current
    }

    /// Path templates, sorted by key.
    pub fn path_templates(&self) -> Vec<&str> {
        self.object_at(&["paths"])
            .map(|paths| paths.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All operations, path by path, methods in `HTTP_METHODS` order.
    pub fn operations(&self) -> Vec<Operation<'_>> {
        let Some(paths) = self.object_at(&["paths"]) else {
            return Vec::new();
        };

        let mut operations = Vec::new();
        for (path, item) in paths {
            let item = self.resolve(item);
            for method in HTTP_METHODS {
                if let Some(node) = item.get(method).filter(|n| n.is_object()) {
                    operations.push(Operation {
                        path: path.as_str(),
                        method,
                        node,
                        path_item: item,
                    });
                }
            }
        }
        operations
    }
}

/// One `(path, method)` pair.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub path: &'a str,
    pub method: &'static str,
    pub node: &'a Value,
    pub path_item: &'a Value,
}

/// A resolved parameter object.
#[derive(Debug, Clone)]
pub struct Parameter<'a> {
    pub name: &'a str,
    pub location: &'a str,
    pub required: bool,
    pub node: &'a Value,

    /// Where the parameter is declared (before `$ref` resolution)
    pub pointer: String,
}

impl<'a> Operation<'a> {
    /// JSON Pointer of this operation.
    pub fn pointer(&self) -> String {
        pointer(&["paths", self.path, self.method])
    }

    /// Pointer to a child of this operation.
    pub fn child_pointer(&self, rest: &[&str]) -> String {
        let mut segments = vec!["paths", self.path, self.method];
        segments.extend_from_slice(rest);
        pointer(&segments)
    }

    pub fn field_str(&self, key: &str) -> Option<&'a str> {
        self.node.get(key).and_then(Value::as_str)
    }

    /// Merged path-item and operation parameters; the operation wins on
    /// `(name, in)` collisions.
    pub fn parameters(&self, doc: &'a SpecDocument) -> Vec<Parameter<'a>> {
        let own = collect_parameters(doc, self.node, &["paths", self.path, self.method]);
        let mut merged: Vec<Parameter<'a>> =
            collect_parameters(doc, self.path_item, &["paths", self.path])
                .into_iter()
                .filter(|inherited| {
                    !own.iter()
                        .any(|p| p.name == inherited.name && p.location == inherited.location)
                })
                .collect();
        merged.extend(own);
        merged
    }

    /// `(status code, resolved response)` pairs.
    pub fn responses(&self, doc: &'a SpecDocument) -> Vec<(&'a str, &'a Value)> {
        self.node
            .get("responses")
            .and_then(Value::as_object)
            .map(|responses| {
                responses
                    .iter()
                    .map(|(code, response)| (code.as_str(), doc.resolve(response)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn collect_parameters<'a>(
    doc: &'a SpecDocument,
    owner: &'a Value,
    base: &[&str],
) -> Vec<Parameter<'a>> {
    let Some(params) = owner.get("parameters").and_then(Value::as_array) else {
        return Vec::new();
    };

    params
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let node = doc.resolve(raw);
            let index = index.to_string();
            let mut segments = base.to_vec();
            segments.extend_from_slice(&["parameters", index.as_str()]);
            Some(Parameter {
                name: node.get("name")?.as_str()?,
                location: node.get("in")?.as_str()?,
                required: node.get("required").and_then(Value::as_bool).unwrap_or(false),
                node,
                pointer: pointer(&segments),
            })
        })
        .collect()
}

/// Non-empty (after trimming) string value.
pub fn non_empty_str(node: Option<&Value>) -> Option<&str> {
    node.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Build an RFC 6901 JSON Pointer from raw segments.
pub fn pointer(segments: &[&str]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    out
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => yaml_number(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                object.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE: &str = r##"
openapi: "3.0.3"
info:
  title: Pets
  version: "1.0.0"
paths:
  /pets:
    parameters:
      - name: tenant
        in: header
    get:
      summary: List pets
      parameters:
        - $ref: "#/components/parameters/Limit"
      responses:
        200:
          description: ok
        "404":
          $ref: "#/components/responses/NotFound"
    post:
      responses:
        "201":
          description: created
components:
  parameters:
    Limit:
      name: limit
      in: query
  responses:
    NotFound:
      description: missing
"##;

    #[test]
    fn test_yaml_integer_keys_become_strings() {
        let doc = SpecDocument::from_yaml(PETSTORE).unwrap();
        assert!(doc.get(&["paths", "/pets", "get", "responses", "200"]).is_some());
    }

    #[test]
    fn test_missing_paths_are_none() {
        let doc = SpecDocument::from_yaml(PETSTORE).unwrap();
        assert!(doc.get(&["info", "contact", "email"]).is_none());
        assert!(doc.array_at(&["servers"]).is_empty());
        assert_eq!(doc.str_at(&["info", "title"]), Some("Pets"));
    }

    #[test]
    fn test_operations_in_method_order() {
        let doc = SpecDocument::from_yaml(PETSTORE).unwrap();
        let ops = doc.operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].method, "get");
        assert_eq!(ops[1].method, "post");
        assert_eq!(ops[0].pointer(), "/paths/~1pets/get");
    }

    #[test]
    fn test_parameters_are_merged_and_resolved() {
        let doc = SpecDocument::from_yaml(PETSTORE).unwrap();
        let ops = doc.operations();
        let params = ops[0].parameters(&doc);
        let names: Vec<&str> = params.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["tenant", "limit"]);
        assert_eq!(params[0].pointer, "/paths/~1pets/parameters/0");
        assert_eq!(params[1].pointer, "/paths/~1pets/get/parameters/0");
    }

    #[test]
    fn test_responses_follow_refs() {
        let doc = SpecDocument::from_yaml(PETSTORE).unwrap();
        let ops = doc.operations();
        let responses = ops[0].responses(&doc);
        let not_found = responses.iter().find(|(code, _)| *code == "404").unwrap();
        assert_eq!(not_found.1["description"], "missing");
    }

    #[test]
    fn test_ref_loop_terminates() {
        let doc = SpecDocument::from_value(serde_json::json!({
            "a": { "$ref": "#/b" },
            "b": { "$ref": "#/a" }
        }));
        let node = doc.get(&["a"]).unwrap();
        assert!(doc.resolve(node).get("$ref").is_some());
    }

    #[test]
    fn test_path_templates_sorted_by_key() {
        let doc = SpecDocument::from_value(serde_json::json!({
            "paths": { "/zones": {}, "/accounts": {}, "/items/{id}": {} }
        }));
        assert_eq!(doc.path_templates(), vec!["/accounts", "/items/{id}", "/zones"]);
    }

    #[test]
    fn test_pointer_escaping() {
        assert_eq!(pointer(&["paths", "/a~b/{id}", "get"]), "/paths/~1a~0b~1{id}/get");
    }

    #[test]
    fn test_parse_detects_json() {
        let doc = SpecDocument::parse(r#"{"openapi": "3.1.0"}"#).unwrap();
        assert_eq!(doc.str_at(&["openapi"]), Some("3.1.0"));
    }
}
